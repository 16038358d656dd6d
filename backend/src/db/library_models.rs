use chrono::NaiveDateTime;
use diesel::prelude::*;
use serde::Serialize;

use crate::db::library_schema::*;

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, PartialEq, Serialize)]
#[diesel(table_name = works)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Work {
    pub id: i32,
    pub title: String,
    pub title_slug: String,
    pub language: Option<String>,
    pub source_path: Option<String>,
    pub imported_at: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = works)]
pub struct NewWork<'a> {
    pub title: &'a str,
    pub title_slug: &'a str,
    pub language: Option<&'a str>,
    pub source_path: Option<&'a str>,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, PartialEq, Serialize)]
#[diesel(table_name = authors)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Author {
    pub id: i32,
    pub name: String,
    pub name_slug: String,
    pub meta_author: bool,
}

#[derive(Insertable)]
#[diesel(table_name = authors)]
pub struct NewAuthor<'a> {
    pub name: &'a str,
    pub name_slug: &'a str,
    pub meta_author: bool,
}

#[derive(Insertable)]
#[diesel(table_name = works_authors)]
pub struct NewWorkAuthor {
    pub work_id: i32,
    pub author_id: i32,
    pub position: i32,
}

#[derive(Insertable)]
#[diesel(table_name = works_editors)]
pub struct NewWorkEditor {
    pub work_id: i32,
    pub author_id: i32,
    pub position: i32,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, PartialEq, Serialize)]
#[diesel(table_name = divisions)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct DivisionRow {
    pub id: i32,
    pub work_id: i32,
    pub parent_division_id: Option<i32>,
    pub sequence_number: i32,
    pub level: i32,
    pub descriptor: String,
    pub title: Option<String>,
    pub original_title: Option<String>,
    pub title_slug: String,
    pub division_type: Option<String>,
    pub readable_unit: bool,
    pub original_content: String,
}

#[derive(Insertable)]
#[diesel(table_name = divisions)]
pub struct NewDivisionRow<'a> {
    pub work_id: i32,
    pub parent_division_id: Option<i32>,
    pub sequence_number: i32,
    pub level: i32,
    pub descriptor: &'a str,
    pub title: Option<&'a str>,
    pub original_title: Option<&'a str>,
    pub title_slug: &'a str,
    pub division_type: Option<&'a str>,
    pub readable_unit: bool,
    pub original_content: &'a str,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, PartialEq, Serialize)]
#[diesel(table_name = verses)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct VerseRow {
    pub id: i32,
    pub division_id: i32,
    pub sequence_number: i32,
    pub indicator: String,
    pub content: String,
    pub original_content: String,
}

#[derive(Insertable)]
#[diesel(table_name = verses)]
pub struct NewVerseRow<'a> {
    pub division_id: i32,
    pub sequence_number: i32,
    pub indicator: &'a str,
    pub content: &'a str,
    pub original_content: &'a str,
}
