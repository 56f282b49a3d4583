//! Rewriting class names inside field and method descriptors.

/// Rewrite every `L<class>;` reference in `descriptor`.
///
/// `map` returns the replacement for a class name, or `None` to keep it.
/// Anything that is not a well formed object type is copied through unchanged.
pub fn map_descriptor<F>(descriptor: &str, mut map: F) -> String
where
    F: FnMut(&str) -> Option<String>,
{
    let mut out = String::with_capacity(descriptor.len());
    let mut rest = descriptor;

    while let Some(start) = rest.find('L') {
        out.push_str(&rest[..=start]);
        let tail = &rest[start + 1..];
        match tail.find(';') {
            Some(end) => {
                let class = &tail[..end];
                match map(class) {
                    Some(mapped) => out.push_str(&mapped),
                    None => out.push_str(class),
                }
                out.push(';');
                rest = &tail[end + 1..];
            }
            None => {
                rest = tail;
                break;
            }
        }
    }

    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rename(name: &str) -> Option<String> {
        match name {
            "a" => Some("net/minecraft/class_1".to_string()),
            "b" => Some("net/minecraft/class_2".to_string()),
            _ => None,
        }
    }

    #[test]
    fn test_method_descriptor() {
        assert_eq!(
            map_descriptor("(La;I[Lb;Ljava/lang/String;)La;", rename),
            "(Lnet/minecraft/class_1;I[Lnet/minecraft/class_2;Ljava/lang/String;)Lnet/minecraft/class_1;"
        );
    }

    #[test]
    fn test_primitives_untouched() {
        assert_eq!(map_descriptor("(IJ[[D)V", rename), "(IJ[[D)V");
    }

    #[test]
    fn test_unterminated_reference_is_copied() {
        assert_eq!(map_descriptor("(La", rename), "(La");
    }
}
