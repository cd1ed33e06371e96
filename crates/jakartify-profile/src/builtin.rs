use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use crate::profile::Profile;
use crate::rule::NamespaceRule;
use crate::ProfileError;

/// `javax.annotation` classes that moved to `jakarta.annotation`.
///
/// `Nullable`/`Nonnull` exist in later releases too, but the JSR-305
/// implementation carries checkers that other implementations cannot satisfy,
/// so they stay where they are.
pub const ANNOTATION_CLASSES: &[&str] = &[
    "Generated",
    "ManagedBean",
    "PostConstruct",
    "PreDestroy",
    "Priority",
    "Resource",
    "Resources",
    "security.DeclareRoles",
    "security.DenyAll",
    "security.PermitAll",
    "security.RolesAllowed",
    "security.RunAs",
    "sql.DataSourceDefinition",
];

/// The fixed set of profiles selectable by name.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BuiltinProfile {
    /// The Jakarta EE specifications implemented by Tomcat.
    Tomcat,
    /// Every Jakarta EE specification.
    Ee,
    /// Jakarta EE back to Java EE 8.
    Jee8,
}

impl BuiltinProfile {
    pub const ALL: [BuiltinProfile; 3] = [Self::Tomcat, Self::Ee, Self::Jee8];

    pub fn as_str(self) -> &'static str {
        match self {
            BuiltinProfile::Tomcat => "TOMCAT",
            BuiltinProfile::Ee => "EE",
            BuiltinProfile::Jee8 => "JEE8",
        }
    }

    pub fn profile(self) -> &'static Profile {
        static TOMCAT: OnceLock<Profile> = OnceLock::new();
        static EE: OnceLock<Profile> = OnceLock::new();
        static JEE8: OnceLock<Profile> = OnceLock::new();

        match self {
            BuiltinProfile::Tomcat => TOMCAT.get_or_init(|| {
                Profile::new(self.as_str(), "javax", "jakarta", tomcat_rules())
            }),
            BuiltinProfile::Ee => {
                EE.get_or_init(|| Profile::new(self.as_str(), "javax", "jakarta", ee_rules()))
            }
            BuiltinProfile::Jee8 => JEE8.get_or_init(|| {
                BuiltinProfile::Ee.profile().inverse_named(self.as_str())
            }),
        }
    }
}

impl fmt::Display for BuiltinProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BuiltinProfile {
    type Err = ProfileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|profile| profile.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| ProfileError::Unknown(s.to_string()))
    }
}

impl Profile {
    /// Looks up a built-in profile by (case-insensitive) name.
    pub fn by_name(name: &str) -> crate::Result<&'static Profile> {
        Ok(name.parse::<BuiltinProfile>()?.profile())
    }
}

fn annotation_rule() -> NamespaceRule {
    NamespaceRule::leaves("annotation", ANNOTATION_CLASSES.iter().copied())
}

fn tomcat_rules() -> Vec<NamespaceRule> {
    vec![
        annotation_rule(),
        NamespaceRule::namespace("ejb"),
        NamespaceRule::namespace("el"),
        NamespaceRule::namespace("mail"),
        NamespaceRule::namespace("persistence"),
        NamespaceRule::namespace("security.auth.message"),
        NamespaceRule::namespace("servlet"),
        NamespaceRule::namespace("transaction").except("xa"),
        NamespaceRule::namespace("websocket"),
    ]
}

fn ee_rules() -> Vec<NamespaceRule> {
    vec![
        NamespaceRule::namespace("activation"),
        annotation_rule(),
        NamespaceRule::namespace("batch"),
        NamespaceRule::namespace("decorator"),
        NamespaceRule::namespace("ejb"),
        NamespaceRule::namespace("el"),
        NamespaceRule::namespace("enterprise"),
        NamespaceRule::namespace("faces"),
        NamespaceRule::namespace("jms"),
        NamespaceRule::namespace("json"),
        NamespaceRule::namespace("jws"),
        NamespaceRule::namespace("interceptor"),
        NamespaceRule::namespace("inject"),
        NamespaceRule::namespace("mail"),
        NamespaceRule::namespace("management.j2ee"),
        NamespaceRule::namespace("persistence"),
        NamespaceRule::namespace("resource"),
        NamespaceRule::namespace("security.auth.message"),
        NamespaceRule::namespace("security.enterprise"),
        NamespaceRule::namespace("security.jacc"),
        NamespaceRule::namespace("servlet"),
        NamespaceRule::namespace("transaction").except("xa"),
        NamespaceRule::namespace("validation"),
        NamespaceRule::namespace("websocket"),
        NamespaceRule::namespace("ws.rs"),
        NamespaceRule::namespace("xml.bind"),
        NamespaceRule::namespace("xml.soap"),
        NamespaceRule::namespace("xml.ws"),
    ]
}
