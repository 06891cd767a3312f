use calmform::Decimal;
use calmform::form::{FormModel, FormOptions, FormRegistry};

#[derive(calmform::form::FormModel)]
struct Profile {
    nickname: Option<String>,
    age: Option<Decimal>,
    tags: Vec<String>,
}

fn main() {
    let form = FormRegistry::from_model(
        &Profile {
            nickname: None,
            age: Some(Decimal::from(30)),
            tags: vec!["rust".to_string()],
        },
        FormOptions::default(),
    );
    form.set_field_value(Profile::fields().nickname(), "calm")
        .expect("set nickname");

    let profile = form.model::<Profile>().expect("model");
    assert_eq!(profile.nickname.as_deref(), Some("calm"));
    assert_eq!(profile.age, Some(Decimal::from(30)));
    assert_eq!(profile.tags, vec!["rust".to_string()]);
}
