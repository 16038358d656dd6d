/// Hook applied to every text node appended to a verse's `content`, and to division titles.
///
/// Script conversion (e.g. Greek beta code to Unicode) plugs in here.
pub trait TextNormalizer: Send + Sync {
    fn normalize(&self, text: &str, language: Option<&str>) -> String;
}

/// Leaves text untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityNormalizer;

impl TextNormalizer for IdentityNormalizer {
    fn normalize(&self, text: &str, _language: Option<&str>) -> String {
        text.to_string()
    }
}

impl<F> TextNormalizer for F
where
    F: Fn(&str, Option<&str>) -> String + Send + Sync,
{
    fn normalize(&self, text: &str, language: Option<&str>) -> String {
        self(text, language)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closure_normalizer() {
        let upper = |t: &str, lang: Option<&str>| match lang {
            Some("greek") => t.to_uppercase(),
            _ => t.to_string(),
        };
        assert_eq!(upper.normalize("menin", Some("greek")), "MENIN");
        assert_eq!(upper.normalize("menin", None), "menin");
    }
}
