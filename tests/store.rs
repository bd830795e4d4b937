use recs::{
    Book, BookDraft, Customer, CustomerDraft, CustomerPatch, MemorySink, Reason, Record,
    RecordId, RecordStore, Result, Sink, StoreError, ValidationError,
};

fn customer(name: &str, email: &str, phone: &str) -> CustomerDraft {
    CustomerDraft {
        name: Some(name.to_string()),
        email: Some(email.to_string()),
        phone: Some(phone.to_string()),
        ..CustomerDraft::default()
    }
}

fn book(title: &str, author: &str, year: Option<i64>) -> BookDraft {
    BookDraft {
        title: Some(title.to_string()),
        author: Some(author.to_string()),
        year,
        ..BookDraft::default()
    }
}

fn customers() -> (RecordStore<Customer, MemorySink<Customer>>, MemorySink<Customer>) {
    let sink = MemorySink::new();
    let store = RecordStore::open(sink.clone()).expect("open store");
    (store, sink)
}

fn books() -> RecordStore<Book, MemorySink<Book>> {
    RecordStore::open(MemorySink::new()).expect("open store")
}

fn validation(result: Result<impl std::fmt::Debug>) -> ValidationError {
    match result {
        Err(StoreError::Validation(e)) => e,
        other => panic!("expected a validation error, got {:?}", other),
    }
}

fn assert_not_found<T: std::fmt::Debug>(result: Result<T>, expected: RecordId) {
    match result {
        Err(StoreError::NotFound { id, .. }) => assert_eq!(id, expected),
        other => panic!("expected NotFound, got {:?}", other),
    }
}

#[test]
fn inserted_record_can_be_read_back() -> Result<()> {
    let (store, _) = customers();
    let raj = store.insert(customer("Raj", "raj@x.com", "111"))?;

    assert_eq!(raj.name, "Raj");
    assert_eq!(store.get_by_id(raj.id)?, raj);
    assert_eq!(store.list_all()?, vec![raj]);
    Ok(())
}

#[test]
fn ids_are_issued_in_increasing_order_and_never_reused() -> Result<()> {
    let (store, _) = customers();
    let a = store.insert(customer("A", "a@x.com", "1"))?;
    let b = store.insert(customer("B", "b@x.com", "2"))?;
    store.delete(b.id)?;
    let c = store.insert(customer("C", "c@x.com", "3"))?;

    assert!(a.id < b.id);
    assert!(b.id < c.id);
    Ok(())
}

#[test]
fn filter_by_author_is_case_insensitive() -> Result<()> {
    let store = books();
    let a = store.insert(book("Book A", "J. Doe", Some(2001)))?;
    store.insert(book("Book B", "Someone Else", Some(1999)))?;
    let c = store.insert(book("Book C", "j. DOE", None))?;

    assert_eq!(store.filter_by_field("author", "j. doe")?, vec![a, c]);
    assert!(store.filter_by_field("author", "nobody")?.is_empty());
    assert_not_found(store.get_by_id(99), 99);
    Ok(())
}

#[test]
fn filter_compares_numbers_numerically() -> Result<()> {
    let store = books();
    let a = store.insert(book("Book A", "J. Doe", Some(2001)))?;
    store.insert(book("Book B", "J. Doe", None))?;

    assert_eq!(store.filter_by_field("year", " 2001")?, vec![a]);
    assert!(store.filter_by_field("year", "two thousand")?.is_empty());
    Ok(())
}

#[test]
fn filter_rejects_undeclared_fields() {
    let store = books();
    let err = validation(store.filter_by_field("isbn", "123"));
    assert_eq!(err, ValidationError::new("isbn", Reason::UnknownField));
}

#[test]
fn duplicate_email_is_rejected_and_store_unchanged() -> Result<()> {
    let (store, sink) = customers();
    let raj = store.insert(customer("Raj", "raj@x.com", "111"))?;

    let err = validation(store.insert(customer("Raj Two", "raj@x.com", "222")));
    assert_eq!(err, ValidationError::new("email", Reason::Duplicate));
    assert_eq!(store.list_all()?, vec![raj.clone()]);
    assert_eq!(sink.snapshot()?, vec![raj]);
    Ok(())
}

#[test]
fn duplicate_phone_is_rejected() -> Result<()> {
    let (store, _) = customers();
    store.insert(customer("Raj", "raj@x.com", "111"))?;

    let err = validation(store.insert(customer("Ana", "ana@x.com", "111")));
    assert_eq!(err, ValidationError::new("phone", Reason::Duplicate));
    Ok(())
}

#[test]
fn validation_reports_the_first_failure_in_order() {
    let (store, _) = customers();

    // missing beats malformed
    let mut draft = customer("", "not-an-email", "111");
    draft.phone = None;
    assert_eq!(
        validation(store.insert(draft)),
        ValidationError::new("name", Reason::Missing)
    );

    assert_eq!(
        validation(store.insert(customer("Raj", "raj@x.com", "   "))),
        ValidationError::new("phone", Reason::Missing)
    );

    assert_eq!(
        validation(store.insert(customer("Raj", "raj at x.com", "111"))),
        ValidationError::new("email", Reason::Malformed)
    );
}

#[test]
fn malformed_emails_are_rejected() {
    let (store, _) = customers();
    for email in &["raj", "@x.com", "raj@", "raj@x", "raj@.com", "raj@x.com.", "r aj@x.com", "a@b@c.com"] {
        let err = validation(store.insert(customer("Raj", email, "111")));
        assert_eq!(err, ValidationError::new("email", Reason::Malformed), "{}", email);
    }
}

#[test]
fn replace_overwrites_every_field() -> Result<()> {
    let (store, _) = customers();
    let mut draft = customer("Raj", "raj@x.com", "111");
    draft.city = Some("Bangalore".to_string());
    draft.country = Some("India".to_string());
    let raj = store.insert(draft)?;

    let replaced = store.replace(raj.id, customer("Rajesh", "rajesh@x.com", "999"))?;

    let expected = Customer {
        id: raj.id,
        name: "Rajesh".to_string(),
        email: "rajesh@x.com".to_string(),
        phone: "999".to_string(),
        gender: None,
        address: None,
        city: None,
        country: None,
    };
    assert_eq!(replaced, expected);
    assert_eq!(store.get_by_id(raj.id)?, expected);
    Ok(())
}

#[test]
fn replace_may_keep_its_own_unique_values() -> Result<()> {
    let (store, _) = customers();
    let raj = store.insert(customer("Raj", "raj@x.com", "111"))?;

    let renamed = store.replace(raj.id, customer("Raj Kumar", "raj@x.com", "111"))?;
    assert_eq!(renamed.name, "Raj Kumar");
    Ok(())
}

#[test]
fn replace_with_anothers_email_fails_and_changes_nothing() -> Result<()> {
    let (store, _) = customers();
    let raj = store.insert(customer("Raj", "raj@x.com", "111"))?;
    let ana = store.insert(customer("Ana", "ana@x.com", "222"))?;

    let err = validation(store.replace(ana.id, customer("Ana", "raj@x.com", "222")));
    assert_eq!(err, ValidationError::new("email", Reason::Duplicate));
    assert_eq!(store.list_all()?, vec![raj, ana]);
    Ok(())
}

#[test]
fn replace_and_patch_of_unknown_id_are_not_found() {
    let (store, _) = customers();
    assert_not_found(store.replace(7, customer("Raj", "raj@x.com", "111")), 7);
    assert_not_found(store.update_partial(7, CustomerPatch::default()), 7);
}

#[test]
fn empty_patch_leaves_record_unchanged() -> Result<()> {
    let (store, _) = customers();
    let raj = store.insert(customer("Raj", "raj@x.com", "111"))?;

    assert_eq!(store.update_partial(raj.id, CustomerPatch::default())?, raj);
    assert_eq!(store.get_by_id(raj.id)?, raj);
    Ok(())
}

#[test]
fn patch_changes_only_the_supplied_fields() -> Result<()> {
    let (store, _) = customers();
    let mut draft = customer("Raj", "raj@x.com", "111");
    draft.city = Some("Bangalore".to_string());
    let raj = store.insert(draft)?;

    let patch = CustomerPatch {
        email: Some(Some("new@x.com".to_string())),
        ..CustomerPatch::default()
    };
    let updated = store.update_partial(raj.id, patch)?;

    assert_eq!(updated.email, "new@x.com");
    assert_eq!(updated.name, raj.name);
    assert_eq!(updated.phone, raj.phone);
    assert_eq!(updated.city, raj.city);
    assert_eq!(store.get_by_id(raj.id)?, updated);
    Ok(())
}

#[test]
fn patch_with_null_clears_optional_fields() -> Result<()> {
    let (store, _) = customers();
    let mut draft = customer("Raj", "raj@x.com", "111");
    draft.city = Some("Bangalore".to_string());
    let raj = store.insert(draft)?;

    let patch: CustomerPatch = serde_json::from_value(serde_json::json!({ "city": null }))?;
    assert_eq!(patch.city, Some(None));

    let updated = store.update_partial(raj.id, patch)?;
    assert_eq!(updated.city, None);
    Ok(())
}

#[test]
fn patch_cannot_clear_required_fields() -> Result<()> {
    let (store, _) = customers();
    let raj = store.insert(customer("Raj", "raj@x.com", "111"))?;

    let patch: CustomerPatch = serde_json::from_value(serde_json::json!({ "name": null }))?;
    assert_eq!(
        validation(store.update_partial(raj.id, patch)),
        ValidationError::new("name", Reason::Missing)
    );

    let patch = CustomerPatch {
        phone: Some(Some(String::new())),
        ..CustomerPatch::default()
    };
    assert_eq!(
        validation(store.update_partial(raj.id, patch)),
        ValidationError::new("phone", Reason::Missing)
    );
    assert_eq!(store.get_by_id(raj.id)?, raj);
    Ok(())
}

#[test]
fn patch_checks_format_and_uniqueness_excluding_self() -> Result<()> {
    let (store, _) = customers();
    let raj = store.insert(customer("Raj", "raj@x.com", "111"))?;
    store.insert(customer("Ana", "ana@x.com", "222"))?;

    let own_email = CustomerPatch {
        email: Some(Some("raj@x.com".to_string())),
        ..CustomerPatch::default()
    };
    assert_eq!(store.update_partial(raj.id, own_email)?, raj);

    let taken = CustomerPatch {
        phone: Some(Some("222".to_string())),
        ..CustomerPatch::default()
    };
    assert_eq!(
        validation(store.update_partial(raj.id, taken)),
        ValidationError::new("phone", Reason::Duplicate)
    );

    let malformed = CustomerPatch {
        email: Some(Some("nope".to_string())),
        ..CustomerPatch::default()
    };
    assert_eq!(
        validation(store.update_partial(raj.id, malformed)),
        ValidationError::new("email", Reason::Malformed)
    );
    Ok(())
}

#[test]
fn deleted_record_is_gone() -> Result<()> {
    let (store, sink) = customers();
    let raj = store.insert(customer("Raj", "raj@x.com", "111"))?;

    store.delete(raj.id)?;
    assert_not_found(store.get_by_id(raj.id), raj.id);
    assert!(store.is_empty()?);
    assert!(sink.snapshot()?.is_empty());
    Ok(())
}

#[test]
fn deleting_unknown_id_is_not_found() {
    let (store, _) = customers();
    assert_not_found(store.delete(42), 42);
}

#[test]
fn deleted_email_can_be_used_again() -> Result<()> {
    let (store, _) = customers();
    let raj = store.insert(customer("Raj", "raj@x.com", "111"))?;
    store.delete(raj.id)?;

    let again = store.insert(customer("Raj", "raj@x.com", "111"))?;
    assert_ne!(again.id, raj.id);
    Ok(())
}

#[test]
fn list_page_slices_in_insertion_order() -> Result<()> {
    let store = books();
    let all: Vec<Book> = (1..=5)
        .map(|n| store.insert(book(&format!("Book {}", n), "J. Doe", None)))
        .collect::<Result<_>>()?;

    assert_eq!(store.list_page(1, 2)?, all[0..2].to_vec());
    assert_eq!(store.list_page(3, 2)?, all[4..5].to_vec());
    assert!(store.list_page(4, 2)?.is_empty());
    assert!(matches!(store.list_page(0, 2), Err(StoreError::InvalidPage)));
    assert!(matches!(store.list_page(1, 0), Err(StoreError::InvalidPage)));
    Ok(())
}

#[test]
fn every_mutation_writes_the_whole_collection_through() -> Result<()> {
    let (store, sink) = customers();
    let raj = store.insert(customer("Raj", "raj@x.com", "111"))?;
    let ana = store.insert(customer("Ana", "ana@x.com", "222"))?;
    assert_eq!(sink.snapshot()?, vec![raj.clone(), ana.clone()]);

    let patch = CustomerPatch {
        city: Some(Some("Delhi".to_string())),
        ..CustomerPatch::default()
    };
    let ana = store.update_partial(ana.id, patch)?;
    assert_eq!(sink.snapshot()?, vec![raj, ana]);
    Ok(())
}

#[test]
fn store_opens_with_what_the_sink_holds() -> Result<()> {
    let existing = vec![Book {
        id: 7,
        title: "Book A".to_string(),
        author: "J. Doe".to_string(),
        year: Some(2001),
        publisher: None,
        price: Some(9.5),
    }];
    let store = RecordStore::open(MemorySink::with_records(existing.clone()))?;

    assert_eq!(store.list_all()?, existing);
    let next = store.insert(book("Book B", "J. Doe", None))?;
    assert_eq!(next.id, 8);
    Ok(())
}

fn stored_customer(id: RecordId, email: &str, phone: &str) -> Customer {
    Customer {
        id,
        name: format!("customer {}", id),
        email: email.to_string(),
        phone: phone.to_string(),
        gender: None,
        address: None,
        city: None,
        country: None,
    }
}

fn assert_corrupt<T: std::fmt::Debug>(result: Result<T>, expected: &str) {
    match result {
        Err(StoreError::Corrupt { collection, detail }) => {
            assert_eq!(collection, "customers");
            assert!(detail.contains(expected), "unexpected detail: {}", detail);
        }
        other => panic!("expected Corrupt, got {:?}", other),
    }
}

#[test]
fn open_rejects_loaded_records_sharing_an_id() {
    let sink = MemorySink::with_records(vec![
        stored_customer(1, "a@x.com", "111"),
        stored_customer(1, "b@x.com", "222"),
    ]);
    assert_corrupt(RecordStore::<Customer, _>::open(sink).map(|_| ()), "id 1 appears more than once");
}

#[test]
fn open_rejects_loaded_records_sharing_a_unique_value() {
    let sink = MemorySink::with_records(vec![
        stored_customer(1, "a@x.com", "111"),
        stored_customer(2, "a@x.com", "222"),
    ]);
    assert_corrupt(RecordStore::<Customer, _>::open(sink).map(|_| ()), "email already exists");

    let sink = MemorySink::with_records(vec![
        stored_customer(1, "a@x.com", "111"),
        stored_customer(2, "b@x.com", "111"),
    ]);
    assert_corrupt(RecordStore::<Customer, _>::open(sink).map(|_| ()), "phone already exists");
}

#[test]
fn open_rejects_loaded_records_failing_their_schema() {
    let sink = MemorySink::with_records(vec![stored_customer(4, "not-an-email", "111")]);
    assert_corrupt(RecordStore::<Customer, _>::open(sink).map(|_| ()), "record 4: email is not valid");
}

#[test]
fn insert_fails_once_the_last_id_was_issued() -> Result<()> {
    let sink = MemorySink::with_records(vec![stored_customer(RecordId::MAX, "a@x.com", "111")]);
    let store = RecordStore::<Customer, _>::open(sink.clone())?;

    assert!(matches!(
        store.insert(customer("Ana", "ana@x.com", "222")),
        Err(StoreError::IdsExhausted("customers"))
    ));
    assert_eq!(store.len()?, 1);
    assert_eq!(sink.snapshot()?.len(), 1);

    // the remaining records stay usable
    let raj = store.replace(RecordId::MAX, customer("Raj", "raj@x.com", "111"))?;
    assert_eq!(raj.id, RecordId::MAX);
    Ok(())
}

#[test]
fn the_last_id_can_be_issued_once() -> Result<()> {
    let sink = MemorySink::with_records(vec![stored_customer(RecordId::MAX - 1, "a@x.com", "111")]);
    let store = RecordStore::<Customer, _>::open(sink)?;

    assert_eq!(store.insert(customer("Ana", "ana@x.com", "222"))?.id, RecordId::MAX);
    assert!(matches!(
        store.insert(customer("Lee", "lee@x.com", "333")),
        Err(StoreError::IdsExhausted(_))
    ));
    Ok(())
}

#[test]
fn surrounding_whitespace_does_not_make_a_value_unique() -> Result<()> {
    let (store, _) = customers();
    store.insert(customer("Raj", "raj@x.com", " 111"))?;

    let err = validation(store.insert(customer("Ana", "ana@x.com", "111 ")));
    assert_eq!(err, ValidationError::new("phone", Reason::Duplicate));

    // case still matters
    store.insert(customer("Lee", "RAJ@x.com", "333"))?;
    Ok(())
}

/// a sink that accepts a fixed number of saves and then fails
struct FailingSink {
    saves_left: usize,
}

impl<R: Record> Sink<R> for FailingSink {
    fn load(&mut self) -> Result<Vec<R>> {
        Ok(vec![])
    }

    fn save(&mut self, _records: &[R]) -> Result<()> {
        if self.saves_left == 0 {
            return Err(StoreError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "disk full",
            )));
        }
        self.saves_left -= 1;
        Ok(())
    }
}

#[test]
fn persistence_failure_rolls_back_every_mutation() -> Result<()> {
    let store: RecordStore<Customer, _> = RecordStore::open(FailingSink { saves_left: 1 })?;
    let raj = store.insert(customer("Raj", "raj@x.com", "111"))?;

    let is_persistence = |result: Result<Customer>| {
        matches!(result, Err(StoreError::Persistence { collection: "customers", .. }))
    };
    assert!(is_persistence(store.insert(customer("Ana", "ana@x.com", "222"))));
    assert!(is_persistence(store.replace(raj.id, customer("Rajesh", "raj@x.com", "111"))));
    let patch = CustomerPatch {
        name: Some(Some("Rajesh".to_string())),
        ..CustomerPatch::default()
    };
    assert!(is_persistence(store.update_partial(raj.id, patch)));
    assert!(matches!(store.delete(raj.id), Err(StoreError::Persistence { .. })));

    assert_eq!(store.list_all()?, vec![raj]);
    Ok(())
}

#[test]
fn concurrent_inserts_never_share_a_unique_value() -> Result<()> {
    let (store, _) = customers();
    let handles: Vec<_> = (0..16)
        .map(|n| {
            let store = store.clone();
            std::thread::spawn(move || {
                store.insert(customer(&format!("Clone {}", n), "same@x.com", &n.to_string()))
            })
        })
        .collect();

    let succeeded = handles
        .into_iter()
        .map(|handle| handle.join().expect("insert thread panicked"))
        .filter(Result::is_ok)
        .count();

    assert_eq!(succeeded, 1);
    assert_eq!(store.len()?, 1);
    Ok(())
}
