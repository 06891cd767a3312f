#![allow(dead_code)]

use calmform::form::FormModel;

#[derive(FormModel)]
enum Choice {
    Yes,
    No,
}

fn main() {}
