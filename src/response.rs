//! JSON success envelope: `{"data": ...}` for one item, `{"data": [...], "meta": {"count": n}}` for lists.

use axum::{http::StatusCode, Json};
use serde::Serialize;

#[derive(Serialize)]
pub struct SuccessOne<T> {
    pub data: T,
}

#[derive(Serialize)]
pub struct SuccessMany<T> {
    pub data: Vec<T>,
    pub meta: MetaCount,
}

#[derive(Serialize)]
pub struct MetaCount {
    pub count: usize,
}

fn one<T: Serialize>(status: StatusCode, data: T) -> (StatusCode, Json<SuccessOne<T>>) {
    (status, Json(SuccessOne { data }))
}

/// 201 with the created item.
pub fn success_one<T: Serialize>(data: T) -> (StatusCode, Json<SuccessOne<T>>) {
    one(StatusCode::CREATED, data)
}

pub fn success_one_ok<T: Serialize>(data: T) -> (StatusCode, Json<SuccessOne<T>>) {
    one(StatusCode::OK, data)
}

pub fn success_many<T: Serialize>(data: Vec<T>) -> (StatusCode, Json<SuccessMany<T>>) {
    let count = data.len();
    (StatusCode::OK, Json(SuccessMany { data, meta: MetaCount { count } }))
}
