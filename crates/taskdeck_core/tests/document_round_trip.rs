use chrono::NaiveDateTime;
use taskdeck_core::{
    load_document, load_from_path, parse_time_delta, save_document, save_to_path, Attachment,
    AttachmentKind, Category, Composite, Date, Effort, Entity, FontSpec, Note, Recurrence,
    RecurrenceUnit, Rgba, Task, TimeDelta, Workspace,
};

fn stamp(spec: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(spec, "%Y-%m-%d %H:%M:%S").unwrap()
}

fn populated_workspace() -> Workspace {
    let mut ws = Workspace::new();
    let parent = ws.add_task(Task::new("parent"), None).unwrap();
    let child = ws.add_task(Task::new("child"), None).unwrap();
    ws.add_child(parent, child, None).unwrap();
    ws.set_description(parent, "the big one", None).unwrap();
    ws.set_due_date(parent, Date::from_ymd(2021, 12, 24), None).unwrap();
    ws.set_priority(parent, 3, None).unwrap();
    ws.set_budget(parent, parse_time_delta("2:30:00"), None).unwrap();
    ws.set_recurrence(
        parent,
        Some(Recurrence::with_max(RecurrenceUnit::Weekly, 2, 5)),
        None,
    )
    .unwrap();
    ws.set_foreground_color(parent, Some(Rgba::opaque(10, 20, 30)), None).unwrap();
    ws.set_font(parent, Some(FontSpec::new("Helvetica", 12)), None).unwrap();
    ws.add_prerequisite(parent, child, None).unwrap();

    let note = ws.add_note(Note::new("loose note"), None).unwrap();
    ws.add_note_to(parent, Note::new("owned note"), None).unwrap();
    ws.add_attachment_to(
        child,
        Attachment::new(AttachmentKind::Uri, "https://example.org", "reference"),
        None,
    )
    .unwrap();

    let category = ws.add_category(Category::new("work"), None).unwrap();
    ws.add_category_link(category, parent, None).unwrap();
    ws.add_category_link(category, note, None).unwrap();
    ws.set_category_filtered(category, true, None).unwrap();

    ws.add_effort(
        Effort::with_id(
            uuid::Uuid::new_v4(),
            child,
            stamp("2021-12-01 09:00:00"),
            Some(stamp("2021-12-01 10:15:00")),
        ),
        None,
    )
    .unwrap();
    ws
}

#[test]
fn save_load_save_is_byte_stable() {
    let ws = populated_workspace();
    let first = save_document(&ws).unwrap();
    let loaded = load_document(&first).unwrap();
    let second = save_document(&loaded).unwrap();
    assert_eq!(first, second);
}

#[test]
fn loading_rebuilds_every_reference() {
    let ws = populated_workspace();
    let text = save_document(&ws).unwrap();
    let loaded = load_document(&text).unwrap();

    assert_eq!(loaded.tasks().len(), ws.tasks().len());
    assert_eq!(loaded.notes().len(), ws.notes().len());
    assert_eq!(loaded.categories().len(), ws.categories().len());
    assert_eq!(loaded.attachments().len(), ws.attachments().len());
    assert_eq!(loaded.efforts().len(), ws.efforts().len());

    let parent = ws
        .tasks()
        .iter()
        .find(|task| task.core().subject() == "parent")
        .unwrap();
    let reloaded = loaded.tasks().get(parent.id()).unwrap();
    assert_eq!(reloaded.due_date(), Date::from_ymd(2021, 12, 24));
    assert_eq!(reloaded.priority(), 3);
    assert_eq!(reloaded.budget(), parse_time_delta("2:30:00"));
    assert_eq!(
        reloaded.recurrence(),
        Some(Recurrence::with_max(RecurrenceUnit::Weekly, 2, 5))
    );
    assert_eq!(reloaded.core().children(), parent.core().children());
    assert_eq!(reloaded.core().notes(), parent.core().notes());
    assert_eq!(reloaded.prerequisite_ids(), parent.prerequisite_ids());
    assert_eq!(reloaded.category_ids(), parent.category_ids());
    assert_eq!(reloaded.core().foreground_color(), Some(Rgba::opaque(10, 20, 30)));

    let category = loaded
        .categories()
        .iter()
        .find(|category| category.core().subject() == "work")
        .unwrap();
    assert!(category.is_filtered());
    assert_eq!(category.categorizable_ids().len(), 2);
}

#[test]
fn document_ends_with_a_newline() {
    let ws = Workspace::new();
    let text = save_document(&ws).unwrap();
    assert!(text.ends_with('\n'));
    assert!(!text.ends_with("\n\n"));
}

#[test]
fn dangling_references_are_skipped_not_fatal() {
    let ws = populated_workspace();
    let text = save_document(&ws).unwrap();

    // Point the category at one extra id that exists nowhere in the
    // document.
    let mut value: serde_json::Value = serde_json::from_str(&text).unwrap();
    value["categories"][0]["categorizables"]
        .as_array_mut()
        .unwrap()
        .push(serde_json::Value::String(uuid::Uuid::new_v4().to_string()));
    let text = serde_json::to_string(&value).unwrap();

    let loaded = load_document(&text).unwrap();
    assert_eq!(loaded.categories().len(), 1);
    assert_eq!(
        loaded.categories().iter().next().unwrap().categorizable_ids().len(),
        2
    );
}

#[test]
fn garbage_input_is_a_parse_error() {
    let err = load_document("{ not json").map(|_| ()).unwrap_err();
    assert!(matches!(err, taskdeck_core::StorageError::Parse(_)));
}

#[test]
fn a_task_without_a_budget_field_still_loads() {
    let ws = populated_workspace();
    let text = save_document(&ws).unwrap();

    let mut value: serde_json::Value = serde_json::from_str(&text).unwrap();
    for task in value["tasks"].as_array_mut().unwrap() {
        task.as_object_mut().unwrap().remove("budget");
    }
    let text = serde_json::to_string(&value).unwrap();

    let loaded = load_document(&text).unwrap();
    assert_eq!(loaded.tasks().len(), ws.tasks().len());
    for task in loaded.tasks().iter() {
        assert_eq!(task.budget(), TimeDelta::ZERO);
    }
}

#[test]
fn loading_from_disk_remembers_the_directory() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("deck.json");
    let ws = populated_workspace();
    save_to_path(&ws, &path).unwrap();

    let loaded = load_from_path(&path).unwrap();
    assert_eq!(loaded.tasks().len(), ws.tasks().len());
    assert_eq!(
        loaded.working_directory().map(|p| p.as_path()),
        Some(dir.path())
    );
}
