#![allow(dead_code)]

use calmform::form::FormModel;

#[derive(FormModel)]
struct Wrapper<T> {
    value: T,
}

fn main() {}
