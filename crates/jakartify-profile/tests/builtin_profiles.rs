use jakartify_profile::{BuiltinProfile, Profile};
use pretty_assertions::assert_eq;

fn convert(profile: &Profile, input: &str) -> String {
    profile.rewrite(input).into_owned()
}

#[test]
fn tomcat_profile_covers_tomcat_specifications() {
    let profile = BuiltinProfile::Tomcat.profile();

    for (input, expected) in [
        ("javax.annotation.PostConstruct", "jakarta.annotation.PostConstruct"),
        ("javax/annotation/security/RolesAllowed", "jakarta/annotation/security/RolesAllowed"),
        ("javax.ejb", "jakarta.ejb"),
        ("javax.el", "jakarta.el"),
        ("javax.mail", "jakarta.mail"),
        ("javax.persistence", "jakarta.persistence"),
        ("javax.security.auth.message", "jakarta.security.auth.message"),
        ("javax.servlet", "jakarta.servlet"),
        ("javax.servlet.ServletContext", "jakarta.servlet.ServletContext"),
        ("javax.transaction", "jakarta.transaction"),
        ("javax.websocket", "jakarta.websocket"),
    ] {
        assert_eq!(convert(profile, input), expected, "input: {input}");
    }
}

#[test]
fn tomcat_profile_leaves_other_namespaces_alone() {
    let profile = BuiltinProfile::Tomcat.profile();

    for input in [
        "javax.activation",
        "javax.batch",
        "javax.enterprise",
        "javax.enterprise.inject.spi.Extension",
        "javax.faces",
        "javax.inject",
        "javax.ws.rs",
        "javax.xml.bind",
        "javax.annotation.processing",
        "javax.management",
        "javax.security.auth",
        "javax.swing",
        "javax.transaction.xa",
        "javax.transaction.xa.XAResource",
        "javax.xml.namespace",
        "javax.xml.XMLConstants",
    ] {
        assert_eq!(convert(profile, input), input, "input: {input}");
    }
}

#[test]
fn ee_profile_covers_every_specification() {
    let profile = BuiltinProfile::Ee.profile();

    for (input, expected) in [
        ("javax.activation", "jakarta.activation"),
        ("javax.annotation.Priority", "jakarta.annotation.Priority"),
        ("javax.batch", "jakarta.batch"),
        ("javax.decorator", "jakarta.decorator"),
        ("javax.enterprise.inject.spi.Extension", "jakarta.enterprise.inject.spi.Extension"),
        ("javax.faces", "jakarta.faces"),
        ("javax.jms", "jakarta.jms"),
        ("javax.json", "jakarta.json"),
        ("javax.jws", "jakarta.jws"),
        ("javax.interceptor", "jakarta.interceptor"),
        ("javax.inject", "jakarta.inject"),
        ("javax.management.j2ee", "jakarta.management.j2ee"),
        ("javax.resource", "jakarta.resource"),
        ("javax.security.enterprise", "jakarta.security.enterprise"),
        ("javax.security.jacc", "jakarta.security.jacc"),
        ("javax.validation", "jakarta.validation"),
        ("javax.ws.rs", "jakarta.ws.rs"),
        ("javax.xml.bind", "jakarta.xml.bind"),
        ("javax.xml.soap", "jakarta.xml.soap"),
        ("javax.xml.ws", "jakarta.xml.ws"),
    ] {
        assert_eq!(convert(profile, input), expected, "input: {input}");
    }

    for input in [
        "javax.annotation.processing",
        "javax.management",
        "javax.transaction.xa",
        "javax.xml.stream",
        "javax.xml.registry",
        "javax.xml.rpc",
        "javax.xml.xpath.XPathConstants",
        "javax.xml.XMLConstants",
    ] {
        assert_eq!(convert(profile, input), input, "input: {input}");
    }
}

#[test]
fn jee8_reverses_ee() {
    let ee = BuiltinProfile::Ee.profile();
    let jee8 = BuiltinProfile::Jee8.profile();
    assert_eq!(jee8.source(), "jakarta");
    assert_eq!(jee8.target(), "javax");

    let original = "Ljavax/servlet/http/HttpServletRequest;Ljavax/ws/rs/core/Response;";
    let forward = convert(ee, original);
    assert_eq!(
        forward,
        "Ljakarta/servlet/http/HttpServletRequest;Ljakarta/ws/rs/core/Response;"
    );
    assert_eq!(convert(jee8, &forward), original);
}

#[test]
fn profiles_resolve_by_name_case_insensitively() {
    assert_eq!(Profile::by_name("tomcat").unwrap().name(), "TOMCAT");
    assert_eq!(Profile::by_name("Ee").unwrap().name(), "EE");
    assert_eq!(Profile::by_name("JEE8").unwrap().name(), "JEE8");
    let err = Profile::by_name("jakarta11").unwrap_err();
    assert!(err.to_string().contains("jakarta11"));
}

#[test]
fn profile_identity_distinguishes_direction() {
    let ee = BuiltinProfile::Ee.profile();
    assert_ne!(ee.identity(), BuiltinProfile::Jee8.profile().identity());
    assert_ne!(ee.identity(), BuiltinProfile::Tomcat.profile().identity());
}
