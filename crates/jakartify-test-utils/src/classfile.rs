use std::collections::HashMap;

pub const ACC_PUBLIC: u16 = 0x0001;
pub const ACC_STATIC: u16 = 0x0008;
pub const ACC_SUPER: u16 = 0x0020;

const MAGIC: u32 = 0xCAFE_BABE;

/// Builds minimal, structurally valid class files for tests.
///
/// Constant pool entries are interned, so adding the same name twice yields a
/// single UTF-8 entry. Every method gets a `Code` attribute; methods without
/// explicit instructions just `return`.
///
/// ```
/// use jakartify_test_utils::{ClassFileBuilder, ACC_PUBLIC};
///
/// let bytes = ClassFileBuilder::new("com/example/Hello")
///     .super_class("javax/servlet/http/HttpServlet")
///     .method(ACC_PUBLIC, "init", "(Ljavax/servlet/ServletConfig;)V")
///     .build();
/// assert_eq!(&bytes[..4], &[0xCA, 0xFE, 0xBA, 0xBE]);
/// ```
#[derive(Debug, Clone)]
pub struct ClassFileBuilder {
    pool: ConstantPoolBuilder,
    this_class: String,
    super_class: String,
    interfaces: Vec<String>,
    fields: Vec<Member>,
    methods: Vec<Member>,
    source_file: Option<String>,
}

#[derive(Debug, Clone)]
struct Member {
    access_flags: u16,
    name: String,
    descriptor: String,
    code: Option<Vec<Instruction>>,
}

#[derive(Debug, Clone)]
enum Instruction {
    GetStatic {
        owner: String,
        name: String,
        descriptor: String,
    },
    LdcString(String),
    Raw(Vec<u8>),
}

impl ClassFileBuilder {
    pub fn new(this_class: &str) -> Self {
        Self {
            pool: ConstantPoolBuilder::default(),
            this_class: this_class.to_string(),
            super_class: "java/lang/Object".to_string(),
            interfaces: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
            source_file: None,
        }
    }

    pub fn super_class(mut self, name: &str) -> Self {
        self.super_class = name.to_string();
        self
    }

    pub fn interface(mut self, name: &str) -> Self {
        self.interfaces.push(name.to_string());
        self
    }

    pub fn field(mut self, access_flags: u16, name: &str, descriptor: &str) -> Self {
        self.fields.push(Member {
            access_flags,
            name: name.to_string(),
            descriptor: descriptor.to_string(),
            code: None,
        });
        self
    }

    pub fn method(mut self, access_flags: u16, name: &str, descriptor: &str) -> Self {
        self.methods.push(Member {
            access_flags,
            name: name.to_string(),
            descriptor: descriptor.to_string(),
            code: Some(Vec::new()),
        });
        self
    }

    /// Appends `getstatic owner.name:descriptor; pop` to the last method.
    pub fn getstatic(mut self, owner: &str, name: &str, descriptor: &str) -> Self {
        self.push_instruction(Instruction::GetStatic {
            owner: owner.to_string(),
            name: name.to_string(),
            descriptor: descriptor.to_string(),
        });
        self
    }

    /// Appends `ldc "value"; pop` to the last method.
    pub fn ldc_string(mut self, value: &str) -> Self {
        self.push_instruction(Instruction::LdcString(value.to_string()));
        self
    }

    /// Appends raw bytecode to the last method.
    pub fn raw_code(mut self, code: &[u8]) -> Self {
        self.push_instruction(Instruction::Raw(code.to_vec()));
        self
    }

    pub fn source_file(mut self, name: &str) -> Self {
        self.source_file = Some(name.to_string());
        self
    }

    /// Adds a `long` constant, which occupies two constant pool slots.
    pub fn long_constant(mut self, value: i64) -> Self {
        self.pool.long(value);
        self
    }

    pub fn build(mut self) -> Vec<u8> {
        let this_class = self.pool.class(&self.this_class);
        let super_class = self.pool.class(&self.super_class);
        let interfaces: Vec<u16> = self
            .interfaces
            .clone()
            .iter()
            .map(|name| self.pool.class(name))
            .collect();

        let fields = std::mem::take(&mut self.fields);
        let methods = std::mem::take(&mut self.methods);
        let mut members = Vec::new();
        for member in fields.iter().chain(methods.iter()) {
            members.push(self.encode_member(member));
        }
        let (encoded_fields, encoded_methods) = members.split_at(fields.len());

        let source_file = self.source_file.clone().map(|name| {
            let attr_name = self.pool.utf8("SourceFile");
            let value = self.pool.utf8(&name);
            (attr_name, value)
        });

        let mut out = Vec::new();
        put_u4(&mut out, MAGIC);
        put_u2(&mut out, 0);
        put_u2(&mut out, 52);
        self.pool.write(&mut out);
        put_u2(&mut out, ACC_PUBLIC | ACC_SUPER);
        put_u2(&mut out, this_class);
        put_u2(&mut out, super_class);
        put_u2(&mut out, interfaces.len() as u16);
        for idx in interfaces {
            put_u2(&mut out, idx);
        }
        put_u2(&mut out, encoded_fields.len() as u16);
        for field in encoded_fields {
            out.extend_from_slice(field);
        }
        put_u2(&mut out, encoded_methods.len() as u16);
        for method in encoded_methods {
            out.extend_from_slice(method);
        }
        match source_file {
            Some((attr_name, value)) => {
                put_u2(&mut out, 1);
                put_u2(&mut out, attr_name);
                put_u4(&mut out, 2);
                put_u2(&mut out, value);
            }
            None => put_u2(&mut out, 0),
        }
        out
    }

    fn push_instruction(&mut self, instruction: Instruction) {
        if self.methods.is_empty() {
            self.methods.push(Member {
                access_flags: ACC_PUBLIC | ACC_STATIC,
                name: "run".to_string(),
                descriptor: "()V".to_string(),
                code: Some(Vec::new()),
            });
        }
        if let Some(code) = self.methods.last_mut().and_then(|m| m.code.as_mut()) {
            code.push(instruction);
        }
    }

    fn encode_member(&mut self, member: &Member) -> Vec<u8> {
        let mut out = Vec::new();
        put_u2(&mut out, member.access_flags);
        put_u2(&mut out, self.pool.utf8(&member.name));
        put_u2(&mut out, self.pool.utf8(&member.descriptor));

        let Some(instructions) = &member.code else {
            put_u2(&mut out, 0);
            return out;
        };

        let mut code = Vec::new();
        for instruction in instructions {
            match instruction {
                Instruction::GetStatic {
                    owner,
                    name,
                    descriptor,
                } => {
                    let field = self.pool.field_ref(owner, name, descriptor);
                    code.push(0xB2);
                    put_u2(&mut code, field);
                    code.push(0x57);
                }
                Instruction::LdcString(value) => {
                    let string = self.pool.string(value);
                    // ldc_w so the index width never depends on pool size.
                    code.push(0x13);
                    put_u2(&mut code, string);
                    code.push(0x57);
                }
                Instruction::Raw(bytes) => code.extend_from_slice(bytes),
            }
        }
        code.push(0xB1);

        let code_name = self.pool.utf8("Code");
        put_u2(&mut out, 1);
        put_u2(&mut out, code_name);
        put_u4(&mut out, (2 + 2 + 4 + code.len() + 2 + 2) as u32);
        put_u2(&mut out, 4);
        put_u2(&mut out, 4);
        put_u4(&mut out, code.len() as u32);
        out.extend_from_slice(&code);
        put_u2(&mut out, 0);
        put_u2(&mut out, 0);
        out
    }
}

#[derive(Debug, Clone, Default)]
struct ConstantPoolBuilder {
    entries: Vec<Vec<u8>>,
    // Number of slots in use; `long`/`double` take two.
    slots: u16,
    interned: HashMap<Vec<u8>, u16>,
}

impl ConstantPoolBuilder {
    fn intern(&mut self, entry: Vec<u8>, width: u16) -> u16 {
        if let Some(&idx) = self.interned.get(&entry) {
            return idx;
        }
        let idx = self.slots + 1;
        self.slots += width;
        self.interned.insert(entry.clone(), idx);
        self.entries.push(entry);
        idx
    }

    fn utf8(&mut self, value: &str) -> u16 {
        let mut entry = vec![1];
        put_u2(&mut entry, value.len() as u16);
        entry.extend_from_slice(value.as_bytes());
        self.intern(entry, 1)
    }

    fn class(&mut self, name: &str) -> u16 {
        let name = self.utf8(name);
        let mut entry = vec![7];
        put_u2(&mut entry, name);
        self.intern(entry, 1)
    }

    fn string(&mut self, value: &str) -> u16 {
        let value = self.utf8(value);
        let mut entry = vec![8];
        put_u2(&mut entry, value);
        self.intern(entry, 1)
    }

    fn field_ref(&mut self, owner: &str, name: &str, descriptor: &str) -> u16 {
        let class = self.class(owner);
        let name = self.utf8(name);
        let descriptor = self.utf8(descriptor);
        let mut name_and_type = vec![12];
        put_u2(&mut name_and_type, name);
        put_u2(&mut name_and_type, descriptor);
        let name_and_type = self.intern(name_and_type, 1);

        let mut entry = vec![9];
        put_u2(&mut entry, class);
        put_u2(&mut entry, name_and_type);
        self.intern(entry, 1)
    }

    fn long(&mut self, value: i64) -> u16 {
        let mut entry = vec![5];
        entry.extend_from_slice(&value.to_be_bytes());
        self.intern(entry, 2)
    }

    fn write(&self, out: &mut Vec<u8>) {
        put_u2(out, self.slots + 1);
        for entry in &self.entries {
            out.extend_from_slice(entry);
        }
    }
}

fn put_u2(out: &mut Vec<u8>, value: u16) {
    out.extend_from_slice(&value.to_be_bytes());
}

fn put_u4(out: &mut Vec<u8>, value: u32) {
    out.extend_from_slice(&value.to_be_bytes());
}
