use calmform::form::{FieldName, FieldValue, FormModel};

#[derive(Clone, calmform::form::FormModel)]
struct DemoForm {
    email: String,
    subscribed: bool,
}

fn main() {
    let fields = DemoForm::fields();
    assert_eq!(fields.email(), FieldName::from("email"));

    let model = DemoForm {
        email: "a@calm.ui".to_string(),
        subscribed: true,
    };
    let mut values = model.to_values();
    assert_eq!(values.get("subscribed"), Some(&FieldValue::Bool(true)));

    values.insert(fields.email(), FieldValue::from("b@calm.ui"));
    let restored = DemoForm::from_values(&values).expect("values round trip");
    assert_eq!(restored.email, "b@calm.ui");
    assert!(restored.subscribed);
}
