//! Named transforms applied to a hole's value at render time.
//!
//! `:[name].UPPERCASE` renders the value of `name` through the `UPPERCASE`
//! property. At most one property applies to a reference.

use crate::rewrite::case;
use std::fmt;

/// A registered property: a name and a pure string transform.
#[derive(Clone, Copy)]
pub struct Property {
    pub name: &'static str,
    transform: fn(&str) -> String,
}

impl Property {
    pub fn apply(&self, value: &str) -> String {
        (self.transform)(value)
    }

    /// Look up a property by its exact (case-sensitive) name.
    pub fn lookup(name: &str) -> Option<&'static Property> {
        PROPERTIES.iter().find(|p| p.name == name)
    }

    /// Closest registered name to `name`, for diagnostics.
    pub fn suggest(name: &str) -> Option<&'static str> {
        PROPERTIES
            .iter()
            .map(|p| (strsim::jaro_winkler(&name.to_lowercase(), &p.name.to_lowercase()), p.name))
            .filter(|(score, _)| *score > 0.9)
            .max_by(|a, b| a.0.total_cmp(&b.0))
            .map(|(_, name)| name)
    }

    pub fn all() -> &'static [Property] {
        PROPERTIES
    }
}

impl fmt::Debug for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Property").field(&self.name).finish()
    }
}

impl PartialEq for Property {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for Property {}

fn value(text: &str) -> String {
    text.to_string()
}

fn length(text: &str) -> String {
    text.chars().count().to_string()
}

fn uppercase(text: &str) -> String {
    text.to_uppercase()
}

fn lowercase(text: &str) -> String {
    text.to_lowercase()
}

static PROPERTIES: &[Property] = &[
    Property {
        name: "value",
        transform: value,
    },
    Property {
        name: "length",
        transform: length,
    },
    Property {
        name: "Capitalize",
        transform: case::capitalize,
    },
    Property {
        name: "uncapitalize",
        transform: case::uncapitalize,
    },
    Property {
        name: "UPPERCASE",
        transform: uppercase,
    },
    Property {
        name: "lowercase",
        transform: lowercase,
    },
    Property {
        name: "UpperCamelCase",
        transform: case::upper_camel,
    },
    Property {
        name: "lowerCamelCase",
        transform: case::lower_camel,
    },
    Property {
        name: "UPPER_SNAKE_CASE",
        transform: case::upper_snake,
    },
    Property {
        name: "lower_snake_case",
        transform: case::lower_snake,
    },
];

#[cfg(test)]
mod tests {
    use super::*;

    fn apply(name: &str, value: &str) -> String {
        Property::lookup(name).unwrap().apply(value)
    }

    #[test]
    fn registry_transforms() {
        assert_eq!(apply("UpperCamelCase", "my_function"), "MyFunction");
        assert_eq!(apply("lower_snake_case", "myFunction"), "my_function");
        assert_eq!(apply("UPPER_SNAKE_CASE", "myFunction"), "MY_FUNCTION");
        assert_eq!(apply("length", "héllo"), "5");
        assert_eq!(apply("value", "as is"), "as is");
        assert_eq!(apply("lowercase", "MiXeD"), "mixed");
    }

    #[test]
    fn lookup_is_case_sensitive() {
        assert!(Property::lookup("uppercase").is_none());
        assert!(Property::lookup("len").is_none());
        assert_eq!(Property::suggest("Uppercase"), Some("UPPERCASE"));
        assert_eq!(Property::suggest("frobnicate"), None);
    }
}
