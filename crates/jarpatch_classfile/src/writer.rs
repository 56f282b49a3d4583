//! Minimal class file writer for building test fixtures.

use crate::code::{GETFIELD, GETSTATIC, INVOKEDYNAMIC, INVOKESTATIC, INVOKEVIRTUAL};
use crate::lambda::LAMBDA_METAFACTORY;
use crate::ReferenceKind;
use std::collections::HashMap;

const METAFACTORY_DESCRIPTOR: &str = "(Ljava/lang/invoke/MethodHandles$Lookup;Ljava/lang/String;Ljava/lang/invoke/MethodType;Ljava/lang/invoke/MethodType;Ljava/lang/invoke/MethodHandle;Ljava/lang/invoke/MethodType;)Ljava/lang/invoke/CallSite;";

struct Member {
    access: u16,
    name: u16,
    descriptor: u16,
    code: Option<Vec<u8>>,
}

/// Builds class files with an interned constant pool.
pub struct ClassWriter {
    pool: Vec<Vec<u8>>,
    interned: HashMap<Vec<u8>, u16>,
    this_class: u16,
    super_class: u16,
    fields: Vec<Member>,
    methods: Vec<Member>,
    bootstrap_methods: Vec<(u16, Vec<u16>)>,
    code_name: u16,
    bootstrap_name: u16,
}

impl ClassWriter {
    pub fn new(name: &str, super_class: Option<&str>) -> Self {
        let mut writer = Self {
            pool: Vec::new(),
            interned: HashMap::new(),
            this_class: 0,
            super_class: 0,
            fields: Vec::new(),
            methods: Vec::new(),
            bootstrap_methods: Vec::new(),
            code_name: 0,
            bootstrap_name: 0,
        };
        writer.this_class = writer.class(name);
        writer.super_class = super_class.map(|s| writer.class(s)).unwrap_or(0);
        writer.code_name = writer.utf8("Code");
        writer
    }

    fn intern(&mut self, entry: Vec<u8>) -> u16 {
        if let Some(index) = self.interned.get(&entry) {
            return *index;
        }
        let index = self.pool.len() as u16 + 1;
        self.interned.insert(entry.clone(), index);
        self.pool.push(entry);
        index
    }

    pub fn utf8(&mut self, value: &str) -> u16 {
        let mut entry = vec![1];
        entry.extend_from_slice(&(value.len() as u16).to_be_bytes());
        entry.extend_from_slice(value.as_bytes());
        self.intern(entry)
    }

    pub fn class(&mut self, name: &str) -> u16 {
        let name = self.utf8(name);
        self.intern(tagged(7, &[name]))
    }

    pub fn name_and_type(&mut self, name: &str, descriptor: &str) -> u16 {
        let name = self.utf8(name);
        let descriptor = self.utf8(descriptor);
        self.intern(tagged(12, &[name, descriptor]))
    }

    pub fn field_ref(&mut self, owner: &str, name: &str, descriptor: &str) -> u16 {
        let owner = self.class(owner);
        let nat = self.name_and_type(name, descriptor);
        self.intern(tagged(9, &[owner, nat]))
    }

    pub fn method_ref(&mut self, owner: &str, name: &str, descriptor: &str) -> u16 {
        let owner = self.class(owner);
        let nat = self.name_and_type(name, descriptor);
        self.intern(tagged(10, &[owner, nat]))
    }

    pub fn method_handle(&mut self, kind: ReferenceKind, reference: u16) -> u16 {
        let mut entry = vec![15, kind as u8];
        entry.extend_from_slice(&reference.to_be_bytes());
        self.intern(entry)
    }

    pub fn method_type(&mut self, descriptor: &str) -> u16 {
        let descriptor = self.utf8(descriptor);
        self.intern(tagged(16, &[descriptor]))
    }

    /// Add a `LambdaMetafactory.metafactory` bootstrap entry pointing at a
    /// static method of this class, returning its bootstrap index.
    pub fn lambda_bootstrap(
        &mut self,
        sam: &str,
        implementation: &str,
        implementation_descriptor: &str,
        instantiated: &str,
    ) -> u16 {
        let owner = self.class_name(self.this_class);
        self.lambda_bootstrap_for(
            &owner,
            sam,
            implementation,
            implementation_descriptor,
            instantiated,
        )
    }

    /// Like [`ClassWriter::lambda_bootstrap`], for an implementation in `owner`.
    pub fn lambda_bootstrap_for(
        &mut self,
        owner: &str,
        sam: &str,
        implementation: &str,
        implementation_descriptor: &str,
        instantiated: &str,
    ) -> u16 {
        self.bootstrap_name = self.utf8("BootstrapMethods");

        let factory = self.method_ref(LAMBDA_METAFACTORY, "metafactory", METAFACTORY_DESCRIPTOR);
        let factory = self.method_handle(ReferenceKind::InvokeStatic, factory);
        let sam = self.method_type(sam);
        let target = self.method_ref(owner, implementation, implementation_descriptor);
        let target = self.method_handle(ReferenceKind::InvokeStatic, target);
        let instantiated = self.method_type(instantiated);

        self.bootstrap_methods
            .push((factory, vec![sam, target, instantiated]));
        self.bootstrap_methods.len() as u16 - 1
    }

    pub fn invoke_dynamic(&mut self, bootstrap: u16, name: &str, descriptor: &str) -> u16 {
        let nat = self.name_and_type(name, descriptor);
        self.intern(tagged(18, &[bootstrap, nat]))
    }

    pub fn field(&mut self, access: u16, name: &str, descriptor: &str) {
        let name = self.utf8(name);
        let descriptor = self.utf8(descriptor);
        self.fields.push(Member {
            access,
            name,
            descriptor,
            code: None,
        });
    }

    pub fn method(&mut self, access: u16, name: &str, descriptor: &str, code: Option<Vec<u8>>) {
        let name = self.utf8(name);
        let descriptor = self.utf8(descriptor);
        self.methods.push(Member {
            access,
            name,
            descriptor,
            code,
        });
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&0xCAFE_BABEu32.to_be_bytes());
        out.extend_from_slice(&0u16.to_be_bytes());
        out.extend_from_slice(&52u16.to_be_bytes());

        out.extend_from_slice(&(self.pool.len() as u16 + 1).to_be_bytes());
        for entry in &self.pool {
            out.extend_from_slice(entry);
        }

        out.extend_from_slice(&0x0021u16.to_be_bytes());
        out.extend_from_slice(&self.this_class.to_be_bytes());
        out.extend_from_slice(&self.super_class.to_be_bytes());
        out.extend_from_slice(&0u16.to_be_bytes());

        for members in [&self.fields, &self.methods] {
            out.extend_from_slice(&(members.len() as u16).to_be_bytes());
            for member in members {
                out.extend_from_slice(&member.access.to_be_bytes());
                out.extend_from_slice(&member.name.to_be_bytes());
                out.extend_from_slice(&member.descriptor.to_be_bytes());
                match &member.code {
                    Some(code) => {
                        out.extend_from_slice(&1u16.to_be_bytes());
                        out.extend_from_slice(&self.code_name.to_be_bytes());
                        out.extend_from_slice(&(code.len() as u32 + 12).to_be_bytes());
                        out.extend_from_slice(&8u16.to_be_bytes());
                        out.extend_from_slice(&8u16.to_be_bytes());
                        out.extend_from_slice(&(code.len() as u32).to_be_bytes());
                        out.extend_from_slice(code);
                        out.extend_from_slice(&0u16.to_be_bytes());
                        out.extend_from_slice(&0u16.to_be_bytes());
                    }
                    None => out.extend_from_slice(&0u16.to_be_bytes()),
                }
            }
        }

        if self.bootstrap_methods.is_empty() {
            out.extend_from_slice(&0u16.to_be_bytes());
        } else {
            let mut body = (self.bootstrap_methods.len() as u16).to_be_bytes().to_vec();
            for (method, arguments) in &self.bootstrap_methods {
                body.extend_from_slice(&method.to_be_bytes());
                body.extend_from_slice(&(arguments.len() as u16).to_be_bytes());
                for argument in arguments {
                    body.extend_from_slice(&argument.to_be_bytes());
                }
            }
            out.extend_from_slice(&1u16.to_be_bytes());
            out.extend_from_slice(&self.bootstrap_name.to_be_bytes());
            out.extend_from_slice(&(body.len() as u32).to_be_bytes());
            out.extend_from_slice(&body);
        }

        out
    }

    fn class_name(&self, class: u16) -> String {
        let entry = &self.pool[usize::from(class) - 1];
        let name = u16::from_be_bytes([entry[1], entry[2]]);
        let utf8 = &self.pool[usize::from(name) - 1];
        String::from_utf8_lossy(&utf8[3..]).into_owned()
    }
}

fn tagged(tag: u8, indices: &[u16]) -> Vec<u8> {
    let mut entry = vec![tag];
    for index in indices {
        entry.extend_from_slice(&index.to_be_bytes());
    }
    entry
}

/// Assembles raw bytecode.
#[derive(Debug, Clone, Default)]
pub struct CodeBuilder {
    code: Vec<u8>,
}

impl CodeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn op(mut self, opcode: u8) -> Self {
        self.code.push(opcode);
        self
    }

    fn with_index(mut self, opcode: u8, index: u16) -> Self {
        self.code.push(opcode);
        self.code.extend_from_slice(&index.to_be_bytes());
        self
    }

    pub fn getstatic(self, field: u16) -> Self {
        self.with_index(GETSTATIC, field)
    }

    pub fn getfield(self, field: u16) -> Self {
        self.with_index(GETFIELD, field)
    }

    pub fn invokevirtual(self, method: u16) -> Self {
        self.with_index(INVOKEVIRTUAL, method)
    }

    pub fn invokestatic(self, method: u16) -> Self {
        self.with_index(INVOKESTATIC, method)
    }

    pub fn invokedynamic(mut self, call_site: u16) -> Self {
        self = self.with_index(INVOKEDYNAMIC, call_site);
        self.code.extend_from_slice(&[0, 0]);
        self
    }

    pub fn finish(self) -> Vec<u8> {
        self.code
    }
}
