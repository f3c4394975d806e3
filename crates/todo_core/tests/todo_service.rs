use chrono::{Duration, TimeZone, Utc};
use std::collections::HashSet;
use std::sync::Arc;
use std::thread;
use tempfile::TempDir;
use todo_core::{
    open_store, CreateTodoRequest, ErrorKind, FileTodoRepository, SortKey, SqliteTodoRepository,
    StoreBackend, StoreConfig, TodoItem, TodoPatch, TodoRepository, TodoService, TodoStore,
    TodoValidationError,
};

/// Runs `scenario` once per shipped backend.
fn each_backend(scenario: impl Fn(&TodoService<TodoStore>)) {
    let dir = TempDir::new().unwrap();
    let file = TodoStore::File(FileTodoRepository::new(dir.path().join("todos.json")));
    scenario(&TodoService::new(file));

    let table = TodoStore::Table(SqliteTodoRepository::open_in_memory().unwrap());
    scenario(&TodoService::new(table));
}

fn seeded(title: &str, minutes: i64) -> TodoItem {
    let mut item = TodoItem::new(title);
    let at = Utc.with_ymd_and_hms(2026, 1, 1, 8, 0, 0).unwrap() + Duration::minutes(minutes);
    item.created_at = at;
    item.updated_at = at;
    item
}

fn titles(items: &[TodoItem]) -> Vec<&str> {
    items.iter().map(|item| item.title.as_str()).collect()
}

#[test]
fn create_applies_defaults_and_normalization() {
    each_backend(|service| {
        let request = CreateTodoRequest {
            title: "  t1  ".to_string(),
            description: Some("   ".to_string()),
            category: Some(" 学习 ".to_string()),
            priority: None,
            due_date: Some("2026-01-02".to_string()),
        };
        let created = service.create(&request).unwrap();

        assert_eq!(created.title, "t1");
        assert_eq!(created.description, None);
        assert_eq!(created.category.as_deref(), Some("学习"));
        assert_eq!(created.priority, todo_core::DEFAULT_PRIORITY);
        assert_eq!(created.due_date.as_deref(), Some("2026-01-02T00:00"));
        assert!(!created.completed);
        assert_eq!(created.created_at, created.updated_at);
        assert_eq!(service.get(&created.id).unwrap(), created);
    });
}

#[test]
fn created_ids_are_unique() {
    each_backend(|service| {
        let ids: HashSet<String> = (0..20)
            .map(|n| service.create(&CreateTodoRequest::new(format!("t{n}"))).unwrap().id)
            .collect();
        assert_eq!(ids.len(), 20);
    });
}

#[test]
fn invalid_create_input_is_rejected_without_writing() {
    each_backend(|service| {
        let blank = service.create(&CreateTodoRequest::new(" ")).unwrap_err();
        assert_eq!(blank.kind(), ErrorKind::InvalidArgument);

        let mut request = CreateTodoRequest::new("t");
        request.priority = Some(4);
        assert_eq!(
            service.create(&request).unwrap_err().kind(),
            ErrorKind::InvalidArgument
        );

        let mut request = CreateTodoRequest::new("t");
        request.due_date = Some("next week".to_string());
        assert_eq!(
            service.create(&request).unwrap_err().kind(),
            ErrorKind::InvalidArgument
        );

        assert!(service.list(None, SortKey::default()).unwrap().is_empty());
    });
}

#[test]
fn missing_ids_are_not_found() {
    each_backend(|service| {
        let patch = TodoPatch {
            title: Some("x".to_string()),
            ..TodoPatch::default()
        };
        assert_eq!(service.update("nope", &patch).unwrap_err().kind(), ErrorKind::NotFound);
        assert_eq!(service.toggle("nope").unwrap_err().kind(), ErrorKind::NotFound);
        assert_eq!(service.delete("nope").unwrap_err().kind(), ErrorKind::NotFound);
        assert_eq!(service.get("nope").unwrap_err().kind(), ErrorKind::NotFound);

        let created = service.create(&CreateTodoRequest::new("short-lived")).unwrap();
        service.delete(&created.id).unwrap();
        assert_eq!(service.toggle(&created.id).unwrap_err().kind(), ErrorKind::NotFound);
        assert_eq!(service.delete(&created.id).unwrap_err().kind(), ErrorKind::NotFound);
    });
}

#[test]
fn blank_title_update_leaves_record_unchanged() {
    each_backend(|service| {
        let created = service.create(&CreateTodoRequest::new("keep me")).unwrap();
        let patch = TodoPatch {
            title: Some("   ".to_string()),
            completed: Some(true),
            ..TodoPatch::default()
        };

        let err = service.update(&created.id, &patch).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert_eq!(service.get(&created.id).unwrap(), created);
    });
}

#[test]
fn update_applies_present_fields_only() {
    each_backend(|service| {
        let mut request = CreateTodoRequest::new("draft");
        request.description = Some("old notes".to_string());
        request.category = Some("工作".to_string());
        request.due_date = Some("2026-05-01T10:00".to_string());
        let created = service.create(&request).unwrap();

        let patch = TodoPatch {
            title: Some(" final ".to_string()),
            description: Some(None),
            priority: Some(3),
            due_date: Some(Some("2026-05-02".to_string())),
            completed: Some(true),
            ..TodoPatch::default()
        };
        let updated = service.update(&created.id, &patch).unwrap();

        assert_eq!(updated.title, "final");
        assert_eq!(updated.description, None);
        assert_eq!(updated.category.as_deref(), Some("工作"));
        assert_eq!(updated.priority, 3);
        assert_eq!(updated.due_date.as_deref(), Some("2026-05-02T00:00"));
        assert!(updated.completed);
        assert_eq!(updated.created_at, created.created_at);
        assert!(updated.updated_at > created.updated_at);

        let clear = TodoPatch {
            category: Some(Some("  ".to_string())),
            due_date: Some(None),
            ..TodoPatch::default()
        };
        let cleared = service.update(&created.id, &clear).unwrap();
        assert_eq!(cleared.category, None);
        assert_eq!(cleared.due_date, None);
    });
}

#[test]
fn no_op_update_keeps_updated_at() {
    each_backend(|service| {
        let created = service.create(&CreateTodoRequest::new("same")).unwrap();

        let unchanged = service.update(&created.id, &TodoPatch::default()).unwrap();
        assert_eq!(unchanged, created);

        let same_title = TodoPatch {
            title: Some("same".to_string()),
            completed: Some(false),
            ..TodoPatch::default()
        };
        let unchanged = service.update(&created.id, &same_title).unwrap();
        assert_eq!(unchanged.updated_at, created.updated_at);
    });
}

#[test]
fn invalid_patch_values_are_rejected() {
    each_backend(|service| {
        let created = service.create(&CreateTodoRequest::new("t")).unwrap();

        let bad_priority = TodoPatch {
            priority: Some(0),
            ..TodoPatch::default()
        };
        let err = service.update(&created.id, &bad_priority).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);

        let bad_due = TodoPatch {
            due_date: Some(Some("2026-02-30".to_string())),
            ..TodoPatch::default()
        };
        let err = service.update(&created.id, &bad_due).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);

        assert_eq!(service.get(&created.id).unwrap(), created);
    });
}

#[test]
fn toggle_twice_restores_state_with_increasing_updated_at() {
    each_backend(|service| {
        let created = service.create(&CreateTodoRequest::new("flip")).unwrap();

        let once = service.toggle(&created.id).unwrap();
        assert!(once.completed);
        assert!(once.updated_at > created.updated_at);

        let twice = service.toggle(&created.id).unwrap();
        assert_eq!(twice.completed, created.completed);
        assert!(twice.updated_at > once.updated_at);
        assert_eq!(twice.created_at, created.created_at);
    });
}

#[test]
fn priority_sort_puts_high_priority_first() {
    each_backend(|service| {
        let mut low = seeded("low", 10);
        low.category = Some("学习".to_string());
        low.priority = 1;
        let mut high = seeded("high", 0);
        high.category = Some("学习".to_string());
        high.priority = 3;
        service.repo().create(&low).unwrap();
        service.repo().create(&high).unwrap();

        let listed = service.list(Some("学习"), SortKey::PriorityDesc).unwrap();
        assert_eq!(titles(&listed), vec!["high", "low"]);
    });
}

#[test]
fn due_date_sorts_keep_undated_items_last() {
    each_backend(|service| {
        let mut later = seeded("later", 0);
        later.due_date = Some("2026-01-02T00:00".to_string());
        let mut sooner = seeded("sooner", 1);
        sooner.due_date = Some("2026-01-01T00:00".to_string());
        let undated_old = seeded("undated-old", 2);
        let undated_new = seeded("undated-new", 3);
        for item in [&later, &sooner, &undated_old, &undated_new] {
            service.repo().create(item).unwrap();
        }

        let asc = service.list(None, SortKey::DueDateAsc).unwrap();
        assert_eq!(
            titles(&asc),
            vec!["sooner", "later", "undated-new", "undated-old"]
        );

        let desc = service.list(None, SortKey::DueDateDesc).unwrap();
        assert_eq!(
            titles(&desc),
            vec!["later", "sooner", "undated-new", "undated-old"]
        );
    });
}

#[test]
fn ties_break_by_creation_descending() {
    each_backend(|service| {
        for (title, minutes) in [("first", 0), ("second", 1), ("third", 2)] {
            service.repo().create(&seeded(title, minutes)).unwrap();
        }

        let by_priority = service.list(None, SortKey::PriorityDesc).unwrap();
        assert_eq!(titles(&by_priority), vec!["third", "second", "first"]);

        let by_created = service.list(None, SortKey::CreatedDesc).unwrap();
        assert_eq!(titles(&by_created), vec!["third", "second", "first"]);
    });
}

#[test]
fn category_filter_and_category_listing() {
    each_backend(|service| {
        for (title, category) in [
            ("a", Some("学习")),
            ("b", Some("工作")),
            ("c", Some(" 学习 ")),
            ("d", None),
            ("e", Some("   ")),
        ] {
            let mut request = CreateTodoRequest::new(title);
            request.category = category.map(str::to_string);
            service.create(&request).unwrap();
        }

        let study = service.list(Some(" 学习"), SortKey::default()).unwrap();
        assert_eq!(study.len(), 2);
        assert!(study
            .iter()
            .all(|item| item.category.as_deref() == Some("学习")));

        let unfiltered = service.list(Some("  "), SortKey::default()).unwrap();
        assert_eq!(unfiltered.len(), 5);

        let mut expected = vec!["学习".to_string(), "工作".to_string()];
        expected.sort();
        assert_eq!(service.list_categories().unwrap(), expected);
    });
}

#[test]
fn parse_sort_aliases() {
    each_backend(|service| {
        assert_eq!(service.parse_sort(None).unwrap(), SortKey::CreatedDesc);
        assert_eq!(service.parse_sort(Some("  ")).unwrap(), SortKey::CreatedDesc);
        assert_eq!(service.parse_sort(Some("Priority")).unwrap(), SortKey::PriorityDesc);
        assert_eq!(service.parse_sort(Some("due")).unwrap(), SortKey::DueDateAsc);
        assert_eq!(service.parse_sort(Some("DUE_DATE_DESC")).unwrap(), SortKey::DueDateDesc);
        assert_eq!(service.parse_sort(Some("created_at")).unwrap(), SortKey::CreatedDesc);

        for key in [
            SortKey::CreatedDesc,
            SortKey::PriorityDesc,
            SortKey::DueDateAsc,
            SortKey::DueDateDesc,
        ] {
            assert_eq!(service.parse_sort(Some(key.as_str())).unwrap(), key);
        }

        let err = service.parse_sort(Some("alphabetical")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    });
}

#[test]
fn sort_key_parse_reports_offending_value() {
    assert_eq!(
        SortKey::parse(Some(" weird ")).unwrap_err(),
        TodoValidationError::UnknownSortKey("weird".to_string())
    );
}

#[test]
fn create_list_toggle_delete_end_to_end() {
    each_backend(|service| {
        let created = service.create(&CreateTodoRequest::new("t1")).unwrap();
        assert_eq!(service.list(None, SortKey::default()).unwrap().len(), 1);

        let toggled = service.toggle(&created.id).unwrap();
        assert!(toggled.completed);

        service.delete(&created.id).unwrap();
        assert!(service.list(None, SortKey::default()).unwrap().is_empty());
    });
}

#[test]
fn file_backend_round_trips_through_restart() {
    let dir = TempDir::new().unwrap();
    let config = StoreConfig {
        backend: StoreBackend::File,
        path: dir.path().join("data").join("todos.json"),
    };

    let service = TodoService::new(open_store(&config).unwrap());
    let mut request = CreateTodoRequest::new("durable");
    request.description = Some("d".to_string());
    request.category = Some("家务".to_string());
    request.priority = Some(1);
    request.due_date = Some("2026-07-08T09:10".to_string());
    let created = service.create(&request).unwrap();
    let toggled = service.toggle(&created.id).unwrap();
    drop(service);

    let restarted = TodoService::new(open_store(&config).unwrap());
    assert_eq!(
        restarted.list(None, SortKey::default()).unwrap(),
        vec![toggled]
    );
}

#[test]
fn table_backend_round_trips_through_restart() {
    let dir = TempDir::new().unwrap();
    let config = StoreConfig {
        backend: StoreBackend::Table,
        path: dir.path().join("data").join("todos.sqlite3"),
    };

    let service = TodoService::new(open_store(&config).unwrap());
    assert_eq!(service.repo().backend(), StoreBackend::Table);
    let created = service.create(&CreateTodoRequest::new("durable")).unwrap();
    drop(service);

    let restarted = TodoService::new(open_store(&config).unwrap());
    assert_eq!(restarted.get(&created.id).unwrap(), created);
}

fn assert_shareable<T: Send + Sync>() {}

#[test]
fn one_service_serves_many_threads_on_each_backend() {
    assert_shareable::<TodoService<TodoStore>>();

    for backend in [StoreBackend::File, StoreBackend::Table] {
        let dir = TempDir::new().unwrap();
        let config = StoreConfig {
            backend,
            path: dir.path().join(format!("todos.{}", backend.as_str())),
        };

        let service = Arc::new(TodoService::new(open_store(&config).unwrap()));
        let handles: Vec<_> = (0..6)
            .map(|worker| {
                let service = Arc::clone(&service);
                thread::spawn(move || {
                    let mut ids = Vec::new();
                    for n in 0..8 {
                        let mut request = CreateTodoRequest::new(format!("w{worker}-{n}"));
                        request.category = Some(format!("c{}", worker % 2));
                        let created = service.create(&request).unwrap();
                        if n % 2 == 0 {
                            service.toggle(&created.id).unwrap();
                        }
                        assert!(!service.list(None, SortKey::PriorityDesc).unwrap().is_empty());
                        ids.push(created.id);
                    }
                    ids
                })
            })
            .collect();

        let ids: HashSet<String> = handles
            .into_iter()
            .flat_map(|handle| handle.join().unwrap())
            .collect();
        assert_eq!(ids.len(), 48, "{}", backend.as_str());

        let listed = service.list(None, SortKey::default()).unwrap();
        assert_eq!(listed.len(), 48);
        assert_eq!(listed.iter().filter(|item| item.completed).count(), 24);
        assert_eq!(service.list_categories().unwrap(), vec!["c0", "c1"]);
        drop(service);

        let restarted = TodoService::new(open_store(&config).unwrap());
        assert_eq!(restarted.list(None, SortKey::default()).unwrap().len(), 48);
    }
}
