//! The record shapes held by a [`RecordStore`].
//!
//! Each shape comes in three flavours:
//! - the stored record itself (`Book`, `Customer`), which always carries an id
//! - a *draft* used for inserts and full replacements, where every field is optional so a
//!   missing required field can be reported instead of failing to decode
//! - a *patch* used for partial updates, where each field distinguishes "not mentioned" from
//!   "set to null"
//!
//! [`RecordStore`]: ../struct.RecordStore.html
use std::fmt::Debug;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::schema::{present, FieldSpec, Fields, Format, Slot};

/// Surrogate key issued by the store on insert
pub type RecordId = u64;

/// A record shape that can be kept in a [`RecordStore`].
///
/// [`RecordStore`]: ../struct.RecordStore.html
pub trait Record:
    Fields + Clone + Debug + PartialEq + Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// candidate used by insert and replace
    type Draft: Fields + Debug + DeserializeOwned + Send;
    /// candidate used by partial updates
    type Patch: Fields + Debug + Default + DeserializeOwned + Send;

    /// collection name, used for routing, file names and error messages
    const COLLECTION: &'static str;

    /// declared fields in validation order
    const SCHEMA: &'static [FieldSpec];

    /// this record's id
    fn id(&self) -> RecordId;

    /// builds a record from a draft that already passed validation.
    /// Fields missing from the draft take their empty value.
    fn from_draft(id: RecordId, draft: Self::Draft) -> Self;

    /// merges the fields mentioned by `patch` into this record
    fn merge(&mut self, patch: Self::Patch);
}

/// A catalog entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Book {
    pub id: RecordId,
    pub title: String,
    pub author: String,
    pub year: Option<i64>,
    pub publisher: Option<String>,
    pub price: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BookDraft {
    pub title: Option<String>,
    pub author: Option<String>,
    pub year: Option<i64>,
    pub publisher: Option<String>,
    pub price: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BookPatch {
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub title: Option<Option<String>>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub author: Option<Option<String>>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub year: Option<Option<i64>>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub publisher: Option<Option<String>>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub price: Option<Option<f64>>,
}

const BOOK_SCHEMA: &[FieldSpec] = &[
    FieldSpec::required("title"),
    FieldSpec::required("author"),
    FieldSpec::optional("year"),
    FieldSpec::optional("publisher"),
    FieldSpec::optional("price"),
];

impl Fields for Book {
    fn field(&self, name: &str) -> Slot<'_> {
        match name {
            "title" => Slot::of(&self.title),
            "author" => Slot::of(&self.author),
            "year" => Slot::of_option(&self.year),
            "publisher" => Slot::of_option(&self.publisher),
            "price" => Slot::of_option(&self.price),
            _ => Slot::Absent,
        }
    }
}

impl Fields for BookDraft {
    fn field(&self, name: &str) -> Slot<'_> {
        match name {
            "title" => Slot::of_option(&self.title),
            "author" => Slot::of_option(&self.author),
            "year" => Slot::of_option(&self.year),
            "publisher" => Slot::of_option(&self.publisher),
            "price" => Slot::of_option(&self.price),
            _ => Slot::Absent,
        }
    }
}

impl Fields for BookPatch {
    fn field(&self, name: &str) -> Slot<'_> {
        match name {
            "title" => Slot::of_patch(&self.title),
            "author" => Slot::of_patch(&self.author),
            "year" => Slot::of_patch(&self.year),
            "publisher" => Slot::of_patch(&self.publisher),
            "price" => Slot::of_patch(&self.price),
            _ => Slot::Absent,
        }
    }
}

impl Record for Book {
    type Draft = BookDraft;
    type Patch = BookPatch;

    const COLLECTION: &'static str = "books";
    const SCHEMA: &'static [FieldSpec] = BOOK_SCHEMA;

    fn id(&self) -> RecordId {
        self.id
    }

    fn from_draft(id: RecordId, draft: BookDraft) -> Self {
        Book {
            id,
            title: draft.title.unwrap_or_default(),
            author: draft.author.unwrap_or_default(),
            year: draft.year,
            publisher: draft.publisher,
            price: draft.price,
        }
    }

    fn merge(&mut self, patch: BookPatch) {
        if let Some(Some(title)) = patch.title {
            self.title = title;
        }
        if let Some(Some(author)) = patch.author {
            self.author = author;
        }
        if let Some(year) = patch.year {
            self.year = year;
        }
        if let Some(publisher) = patch.publisher {
            self.publisher = publisher;
        }
        if let Some(price) = patch.price {
            self.price = price;
        }
    }
}

/// A customer of the shop. `email` and `phone` identify a customer and are unique.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub id: RecordId,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub gender: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CustomerDraft {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub gender: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerPatch {
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub name: Option<Option<String>>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub email: Option<Option<String>>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub phone: Option<Option<String>>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub gender: Option<Option<String>>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub address: Option<Option<String>>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub city: Option<Option<String>>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub country: Option<Option<String>>,
}

const CUSTOMER_SCHEMA: &[FieldSpec] = &[
    FieldSpec::required("name"),
    FieldSpec::unique("email", Some(Format::Email)),
    FieldSpec::unique("phone", None),
    FieldSpec::optional("gender"),
    FieldSpec::optional("address"),
    FieldSpec::optional("city"),
    FieldSpec::optional("country"),
];

impl Fields for Customer {
    fn field(&self, name: &str) -> Slot<'_> {
        match name {
            "name" => Slot::of(&self.name),
            "email" => Slot::of(&self.email),
            "phone" => Slot::of(&self.phone),
            "gender" => Slot::of_option(&self.gender),
            "address" => Slot::of_option(&self.address),
            "city" => Slot::of_option(&self.city),
            "country" => Slot::of_option(&self.country),
            _ => Slot::Absent,
        }
    }
}

impl Fields for CustomerDraft {
    fn field(&self, name: &str) -> Slot<'_> {
        match name {
            "name" => Slot::of_option(&self.name),
            "email" => Slot::of_option(&self.email),
            "phone" => Slot::of_option(&self.phone),
            "gender" => Slot::of_option(&self.gender),
            "address" => Slot::of_option(&self.address),
            "city" => Slot::of_option(&self.city),
            "country" => Slot::of_option(&self.country),
            _ => Slot::Absent,
        }
    }
}

impl Fields for CustomerPatch {
    fn field(&self, name: &str) -> Slot<'_> {
        match name {
            "name" => Slot::of_patch(&self.name),
            "email" => Slot::of_patch(&self.email),
            "phone" => Slot::of_patch(&self.phone),
            "gender" => Slot::of_patch(&self.gender),
            "address" => Slot::of_patch(&self.address),
            "city" => Slot::of_patch(&self.city),
            "country" => Slot::of_patch(&self.country),
            _ => Slot::Absent,
        }
    }
}

impl Record for Customer {
    type Draft = CustomerDraft;
    type Patch = CustomerPatch;

    const COLLECTION: &'static str = "customers";
    const SCHEMA: &'static [FieldSpec] = CUSTOMER_SCHEMA;

    fn id(&self) -> RecordId {
        self.id
    }

    fn from_draft(id: RecordId, draft: CustomerDraft) -> Self {
        Customer {
            id,
            name: draft.name.unwrap_or_default(),
            email: draft.email.unwrap_or_default(),
            phone: draft.phone.unwrap_or_default(),
            gender: draft.gender,
            address: draft.address,
            city: draft.city,
            country: draft.country,
        }
    }

    fn merge(&mut self, patch: CustomerPatch) {
        if let Some(Some(name)) = patch.name {
            self.name = name;
        }
        if let Some(Some(email)) = patch.email {
            self.email = email;
        }
        if let Some(Some(phone)) = patch.phone {
            self.phone = phone;
        }
        if let Some(gender) = patch.gender {
            self.gender = gender;
        }
        if let Some(address) = patch.address {
            self.address = address;
        }
        if let Some(city) = patch.city {
            self.city = city;
        }
        if let Some(country) = patch.country {
            self.country = country;
        }
    }
}
