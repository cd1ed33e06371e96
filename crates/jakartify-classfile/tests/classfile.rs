use jakartify_classfile::{ClassFile, ClassFileError, CpInfo, ExclusionAnalyzer};
use jakartify_test_utils::{ClassFileBuilder, ACC_PUBLIC};
use pretty_assertions::assert_eq;

fn servlet_class() -> Vec<u8> {
    ClassFileBuilder::new("com/example/HelloServlet")
        .super_class("javax/servlet/http/HttpServlet")
        .interface("javax/servlet/Filter")
        .field(ACC_PUBLIC, "context", "Ljavax/servlet/ServletContext;")
        .method(
            ACC_PUBLIC,
            "doGet",
            "(Ljavax/servlet/http/HttpServletRequest;Ljavax/servlet/http/HttpServletResponse;)V",
        )
        .ldc_string("javax.servlet.include.request_uri")
        .long_constant(7)
        .source_file("HelloServlet.java")
        .build()
}

#[test]
fn parse_exposes_structure() {
    let bytes = servlet_class();
    let class = ClassFile::parse(&bytes).unwrap();

    assert_eq!(class.major_version, 52);
    assert_eq!(class.this_class_name().unwrap(), "com/example/HelloServlet");
    assert_eq!(
        class.constant_pool.get_class_name(class.super_class).unwrap(),
        "javax/servlet/http/HttpServlet"
    );
    assert_eq!(class.interfaces.len(), 1);
    assert_eq!(class.fields.len(), 1);
    assert_eq!(class.methods.len(), 1);
    assert_eq!(class.attributes.len(), 1);

    let method = &class.methods[0];
    assert_eq!(method.name(&class.constant_pool).unwrap(), "doGet");
    let code = method.code(&class.constant_pool).unwrap().unwrap();
    let opcodes: Vec<u8> = code
        .instructions()
        .map(|insn| insn.unwrap().opcode)
        .collect();
    // ldc_w, pop, return
    assert_eq!(opcodes, vec![0x13, 0x57, 0xB1]);

    assert!(class
        .constant_pool
        .iter()
        .any(|(_, info)| matches!(info, CpInfo::Long(7))));
}

#[test]
fn unmodified_class_serializes_identically() {
    let bytes = servlet_class();
    let class = ClassFile::parse(&bytes).unwrap();
    assert_eq!(class.to_bytes(), bytes);
}

#[test]
fn patched_pool_keeps_everything_else() {
    let bytes = servlet_class();
    let mut class = ClassFile::parse(&bytes).unwrap();
    let indices: Vec<u16> = class.constant_pool.utf8_indices().collect();
    for idx in indices {
        let value = class.constant_pool.get_utf8(idx).unwrap().into_owned();
        if value.contains("javax") {
            let patched = value.replace("javax", "jakarta");
            class.constant_pool.set_utf8(idx, &patched).unwrap();
        }
    }

    let out = class.to_bytes();
    assert_ne!(out, bytes);
    let reparsed = ClassFile::parse(&out).unwrap();
    assert_eq!(reparsed.fields.len(), 1);
    assert_eq!(reparsed.methods.len(), 1);
    assert_eq!(reparsed.attributes.len(), 1);
    assert_eq!(
        reparsed
            .constant_pool
            .get_class_name(reparsed.super_class)
            .unwrap(),
        "jakarta/servlet/http/HttpServlet"
    );
    assert_eq!(
        reparsed.fields[0]
            .descriptor(&reparsed.constant_pool)
            .unwrap(),
        "Ljakarta/servlet/ServletContext;"
    );
}

#[test]
fn rejects_non_class_input() {
    assert!(matches!(
        ClassFile::parse(b"PK\x03\x04 not a class"),
        Err(ClassFileError::InvalidMagic(0x504B0304))
    ));
    assert!(matches!(
        ClassFile::parse(&[0xCA, 0xFE, 0xBA, 0xBE, 0x00]),
        Err(ClassFileError::UnexpectedEof)
    ));

    let mut trailing = servlet_class();
    trailing.push(0);
    assert!(matches!(
        ClassFile::parse(&trailing),
        Err(ClassFileError::TrailingBytes(1))
    ));
}

#[test]
fn xpath_constants_are_excluded() {
    let bytes = ClassFileBuilder::new("com/example/XmlServlet")
        .method(ACC_PUBLIC, "evaluate", "()Ljava/lang/Object;")
        .getstatic(
            "javax/xml/xpath/XPathConstants",
            "NODESET",
            "Ljavax/xml/namespace/QName;",
        )
        .getstatic(
            "javax/servlet/DispatcherType",
            "REQUEST",
            "Ljavax/servlet/DispatcherType;",
        )
        .build();
    let class = ClassFile::parse(&bytes).unwrap();

    let exclusions = ExclusionAnalyzer::analyze(&class);
    assert_eq!(
        exclusions.iter().collect::<Vec<_>>(),
        vec!["javax.xml.namespace.QName"]
    );
    assert!(exclusions.excludes("Ljavax/xml/namespace/QName;"));
    assert!(exclusions.excludes("(Ljavax/xml/namespace/QName;)V"));
    assert!(!exclusions.excludes("Ljavax/servlet/DispatcherType;"));
}

#[test]
fn undecodable_method_contributes_nothing() {
    let bytes = ClassFileBuilder::new("com/example/Broken")
        .method(ACC_PUBLIC, "broken", "()V")
        .getstatic(
            "javax/xml/xpath/XPathConstants",
            "NODE",
            "Ljavax/xml/namespace/QName;",
        )
        // 0xE0 is not a defined opcode.
        .raw_code(&[0xE0])
        .method(ACC_PUBLIC, "fine", "()V")
        .build();
    let class = ClassFile::parse(&bytes).unwrap();

    let exclusions = ExclusionAnalyzer::analyze(&class);
    assert!(exclusions.is_empty());
}

#[test]
fn classes_without_xpath_references_skip_analysis() {
    let class_bytes = servlet_class();
    let class = ClassFile::parse(&class_bytes).unwrap();
    assert!(ExclusionAnalyzer::analyze(&class).is_empty());
}
