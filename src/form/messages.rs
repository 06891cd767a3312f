use std::collections::BTreeMap;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum ValidationRule {
    Required,
    Email,
    Url,
    Number,
    Min,
    Max,
    MinLength,
    MaxLength,
    Pattern,
}

impl ValidationRule {
    pub const fn default_template(self) -> &'static str {
        match self {
            ValidationRule::Required => "This field is required",
            ValidationRule::Email => "Please enter a valid email address",
            ValidationRule::Url => "Please enter a valid URL",
            ValidationRule::Number => "Please enter a valid number",
            ValidationRule::Min => "Value must be at least {min}",
            ValidationRule::Max => "Value must be at most {max}",
            ValidationRule::MinLength => "Must be at least {length} characters",
            ValidationRule::MaxLength => "Must be at most {length} characters",
            ValidationRule::Pattern => "Invalid format",
        }
    }
}

/// Per-field message overrides. Templates may reference `{min}`, `{max}` and
/// `{length}`; unknown tokens are left as written.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ValidationMessages {
    overrides: BTreeMap<ValidationRule, String>,
}

impl ValidationMessages {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, rule: ValidationRule, template: impl Into<String>) -> Self {
        self.set(rule, template);
        self
    }

    pub fn set(&mut self, rule: ValidationRule, template: impl Into<String>) {
        self.overrides.insert(rule, template.into());
    }

    pub fn template(&self, rule: ValidationRule) -> &str {
        self.overrides
            .get(&rule)
            .map(String::as_str)
            .unwrap_or(rule.default_template())
    }

    pub fn render(&self, rule: ValidationRule, params: &[(&str, &str)]) -> String {
        format_template(self.template(rule), params)
    }
}

fn format_template(template: &str, params: &[(&str, &str)]) -> String {
    let mut output = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        output.push_str(&rest[..open]);
        let body = &rest[open + 1..];
        let Some(close) = body.find('}') else {
            output.push_str(&rest[open..]);
            return output;
        };

        let token = &body[..close];
        match params.iter().find(|(key, _)| *key == token) {
            Some((_, value)) => output.push_str(value),
            None => output.push_str(&rest[open..open + close + 2]),
        }
        rest = &body[close + 1..];
    }

    output.push_str(rest);
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_render_with_params() {
        let messages = ValidationMessages::new();
        assert_eq!(
            messages.render(ValidationRule::MinLength, &[("length", "3")]),
            "Must be at least 3 characters"
        );
        assert_eq!(
            messages.render(ValidationRule::Required, &[]),
            "This field is required"
        );
    }

    #[test]
    fn overrides_replace_defaults_and_keep_unknown_tokens() {
        let messages =
            ValidationMessages::new().with(ValidationRule::Min, "{min}+ only, {who} knows");
        assert_eq!(
            messages.render(ValidationRule::Min, &[("min", "18")]),
            "18+ only, {who} knows"
        );
        let unclosed = ValidationMessages::new().with(ValidationRule::Pattern, "bad {input");
        assert_eq!(unclosed.render(ValidationRule::Pattern, &[("input", "x")]), "bad {input");
        assert_eq!(
            messages.render(ValidationRule::Max, &[("max", "9")]),
            "Value must be at most 9"
        );
    }
}
