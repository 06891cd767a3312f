#![allow(dead_code)]

use calmform::form::FormModel;

#[derive(FormModel)]
struct Pair(String, bool);

fn main() {}
