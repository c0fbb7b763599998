use adg_core::{
    Decision, DecisionFilter, DecisionRepository, FileDecisionRepository, FileModelRepository,
    ModelService, ModelServiceError,
};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use walkdir::WalkDir;

type Service = ModelService<FileModelRepository, FileDecisionRepository>;

fn service() -> Service {
    ModelService::new(FileModelRepository::new(), FileDecisionRepository::default())
}

fn model_with(service: &Service, root: &Path, name: &str, titles: &[&str]) -> PathBuf {
    let model = root.join(name);
    service.create_model(&model).unwrap();
    for title in titles {
        service.decisions().add_new(&model, title).unwrap();
    }
    model
}

/// Relative path -> bytes of every file below `model`.
fn snapshot(model: &Path) -> BTreeMap<PathBuf, Vec<u8>> {
    WalkDir::new(model)
        .into_iter()
        .map(Result::unwrap)
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| {
            let relative = entry.path().strip_prefix(model).unwrap().to_path_buf();
            (relative, std::fs::read(entry.path()).unwrap())
        })
        .collect()
}

fn by_id(service: &Service, model: &Path) -> BTreeMap<String, Decision> {
    service
        .decisions()
        .get_all(model)
        .unwrap()
        .into_iter()
        .map(|decision| (decision.id.clone(), decision))
        .collect()
}

/// Model B with "B two" preceding "B one".
fn linked_second_model(service: &Service, root: &Path) -> PathBuf {
    let model = model_with(service, root, "b", &["B one", "B two"]);
    let decisions = service.decisions();
    let mut one = decisions.get_by_id(&model, "0001").unwrap();
    let mut two = decisions.get_by_id(&model, "0002").unwrap();
    decisions.link(&model, &mut two, &mut one, "", "").unwrap();
    model
}

#[test]
fn merge_shifts_second_model_and_leaves_sources_alone() {
    let dir = TempDir::new().unwrap();
    let service = service();
    let first = model_with(&service, dir.path(), "a", &["A one", "A two"]);
    let second = linked_second_model(&service, dir.path());
    let before_first = snapshot(&first);
    let before_second = snapshot(&second);

    let target = dir.path().join("merged");
    let count = service
        .merge_models(&first, &second, &target, &DecisionFilter::default())
        .unwrap();
    assert_eq!(count, 4);

    let merged = by_id(&service, &target);
    let titles: Vec<&str> = merged.values().map(|d| d.title.as_str()).collect();
    assert_eq!(titles, ["A one", "A two", "B one", "B two"]);
    assert_eq!(merged["0003"].links.succeeds, ["0004"]);
    assert_eq!(merged["0004"].links.precedes, ["0003"]);
    assert!(merged["0001"].links.is_empty());

    assert!(service.validate_consistency(&target).is_ok());
    assert!(service.validate_content(&target).is_ok());
    assert_eq!(snapshot(&first), before_first);
    assert_eq!(snapshot(&second), before_second);
}

#[test]
fn merge_refuses_existing_target() {
    let dir = TempDir::new().unwrap();
    let service = service();
    let first = model_with(&service, dir.path(), "a", &["A one"]);
    let second = model_with(&service, dir.path(), "b", &["B one"]);
    let target = model_with(&service, dir.path(), "merged", &[]);

    assert!(matches!(
        service
            .merge_models(&first, &second, &target, &DecisionFilter::default())
            .unwrap_err(),
        ModelServiceError::ModelAlreadyExists(path) if path == target
    ));
    assert!(service.decisions().get_all(&target).unwrap().is_empty());
}

#[test]
fn import_appends_after_highest_target_id() {
    let dir = TempDir::new().unwrap();
    let service = service();
    let target = model_with(&service, dir.path(), "a", &["A one", "A two", "A three"]);
    let source = linked_second_model(&service, dir.path());
    let before_source = snapshot(&source);

    let count = service
        .import_model(&source, &target, &DecisionFilter::default())
        .unwrap();
    assert_eq!(count, 2);

    let imported = by_id(&service, &target);
    assert_eq!(imported.len(), 5);
    assert_eq!(imported["0004"].title, "B one");
    assert_eq!(imported["0004"].links.succeeds, ["0005"]);
    assert_eq!(imported["0005"].links.precedes, ["0004"]);
    assert_eq!(snapshot(&source), before_source);
}

#[test]
fn import_requires_existing_target() {
    let dir = TempDir::new().unwrap();
    let service = service();
    let source = model_with(&service, dir.path(), "b", &["B one"]);
    let missing = dir.path().join("missing");

    assert!(matches!(
        service
            .import_model(&source, &missing, &DecisionFilter::default())
            .unwrap_err(),
        ModelServiceError::ModelMissing(path) if path == missing
    ));
    assert!(!missing.exists());
}

#[test]
fn copy_model_keeps_ids_and_bytes_of_selected_files() {
    let dir = TempDir::new().unwrap();
    let service = service();
    let source = model_with(&service, dir.path(), "a", &["A one", "A two", "A three"]);
    let decisions = service.decisions();
    let mut two = decisions.get_by_id(&source, "0002").unwrap();
    decisions.tag(&source, &mut two, "infra").unwrap();

    let target = dir.path().join("copy");
    let filter = DecisionFilter {
        tags: vec!["infra".to_string()],
        ..DecisionFilter::default()
    };
    assert_eq!(service.copy_model(&source, &target, &filter).unwrap(), 1);

    let copied = by_id(&service, &target);
    assert_eq!(copied.keys().collect::<Vec<_>>(), ["0002"]);
    let source_file = decisions.repo().find_decision_file(&source, "0002").unwrap();
    let target_file = decisions.repo().find_decision_file(&target, "0002").unwrap();
    assert_eq!(
        std::fs::read(source_file).unwrap(),
        std::fs::read(target_file).unwrap()
    );

    assert!(matches!(
        service.copy_model(&source, &target, &filter).unwrap_err(),
        ModelServiceError::ModelAlreadyExists(_)
    ));
}

#[test]
fn filtered_merge_selects_from_both_models() {
    let dir = TempDir::new().unwrap();
    let service = service();
    let first = model_with(&service, dir.path(), "a", &["A one", "A two"]);
    let second = model_with(&service, dir.path(), "b", &["B one", "B two"]);
    let target = dir.path().join("merged");

    let filter = DecisionFilter {
        ids: vec!["2-2".to_string()],
        ..DecisionFilter::default()
    };
    assert_eq!(
        service
            .merge_models(&first, &second, &target, &filter)
            .unwrap(),
        2
    );

    let merged = by_id(&service, &target);
    let titles: Vec<&str> = merged.values().map(|d| d.title.as_str()).collect();
    assert_eq!(titles, ["A two", "B two"]);
    assert_eq!(merged.keys().collect::<Vec<_>>(), ["0001", "0002"]);
}

#[test]
fn invalid_filter_aborts_transfer() {
    let dir = TempDir::new().unwrap();
    let service = service();
    let source = model_with(&service, dir.path(), "a", &["A one"]);
    let target = model_with(&service, dir.path(), "t", &[]);
    let filter = DecisionFilter {
        ids: vec!["3-1".to_string()],
        ..DecisionFilter::default()
    };

    assert!(matches!(
        service.import_model(&source, &target, &filter).unwrap_err(),
        ModelServiceError::Decision(_)
    ));
    assert!(service.decisions().get_all(&target).unwrap().is_empty());
}
