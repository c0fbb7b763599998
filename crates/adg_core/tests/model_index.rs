use adg_core::{
    ConsistencyIssue, DecisionRepository, FileDecisionRepository, FileModelRepository,
    ModelService, ModelServiceError, RepoError, Section,
};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

type Service = ModelService<FileModelRepository, FileDecisionRepository>;

fn setup_with(titles: &[&str]) -> (TempDir, PathBuf, Service) {
    let dir = TempDir::new().unwrap();
    let model = dir.path().join("model");
    let service = ModelService::new(FileModelRepository::new(), FileDecisionRepository::default());
    service.create_model(&model).unwrap();
    for title in titles {
        service.decisions().add_new(&model, title).unwrap();
    }
    (dir, model, service)
}

fn decision_path(service: &Service, model: &Path, id: &str) -> PathBuf {
    service
        .decisions()
        .repo()
        .find_decision_file(model, id)
        .unwrap()
}

fn index_bytes(model: &Path) -> Vec<u8> {
    std::fs::read(model.join("index.yaml")).unwrap()
}

#[test]
fn new_model_has_empty_index() {
    let (_dir, model, service) = setup_with(&[]);
    assert!(service.exists(&model));
    assert_eq!(
        std::fs::read_to_string(model.join("index.yaml")).unwrap(),
        "decisions: {}\n"
    );
    assert!(service.decisions().get_all(&model).unwrap().is_empty());
}

#[test]
fn rebuild_is_deterministic_and_matches_incremental_writes() {
    let (_dir, model, service) = setup_with(&["Use Kafka", "Pick database", "Logging stack"]);
    let incremental = index_bytes(&model);

    assert_eq!(service.rebuild_index(&model).unwrap(), 3);
    let first = index_bytes(&model);
    assert_eq!(service.rebuild_index(&model).unwrap(), 3);
    assert_eq!(index_bytes(&model), first);
    assert_eq!(first, incremental);

    let text = String::from_utf8(first).unwrap();
    let positions: Vec<usize> = ["'0001':", "'0002':", "'0003':"]
        .iter()
        .map(|key| text.find(key).unwrap())
        .collect();
    assert!(positions.windows(2).all(|pair| pair[0] < pair[1]));
}

#[test]
fn rebuild_rejects_duplicate_ids_and_keeps_index() {
    let (_dir, model, service) = setup_with(&["Use Kafka", "Pick database"]);
    let before = index_bytes(&model);

    let original = decision_path(&service, &model, "0001");
    let nested = model.join("archive");
    std::fs::create_dir_all(&nested).unwrap();
    std::fs::copy(&original, nested.join("AD0001-old-copy.md")).unwrap();

    assert!(matches!(
        service.rebuild_index(&model).unwrap_err(),
        ModelServiceError::DuplicateId(id) if id == "0001"
    ));
    assert_eq!(index_bytes(&model), before);
    assert!(matches!(
        service.validate_consistency(&model).unwrap_err(),
        ModelServiceError::DuplicateId(_)
    ));
}

#[test]
fn consistency_reports_drift_until_rebuilt() {
    let (_dir, model, service) = setup_with(&["Use Kafka", "Pick database", "Logging stack"]);
    let report = service.validate_consistency(&model).unwrap();
    assert_eq!(report.checked, ["0001", "0002", "0003"]);

    let first = decision_path(&service, &model, "0001");
    let text = std::fs::read_to_string(&first).unwrap();
    std::fs::write(&first, text.replace("title: Use Kafka", "title: Use Pulsar")).unwrap();
    std::fs::remove_file(decision_path(&service, &model, "0003")).unwrap();

    let err = service.validate_consistency(&model).unwrap_err();
    match err {
        ModelServiceError::MetadataMismatch { issues } => assert_eq!(
            issues,
            [
                ConsistencyIssue::MetadataMismatch("0001".to_string()),
                ConsistencyIssue::OnlyInIndex("0003".to_string()),
            ]
        ),
        other => panic!("unexpected error: {other}"),
    }

    assert_eq!(service.rebuild_index(&model).unwrap(), 2);
    let report = service.validate_consistency(&model).unwrap();
    assert_eq!(report.checked, ["0001", "0002"]);
    assert_eq!(
        service.decisions().get_by_id(&model, "0001").unwrap().title,
        "Use Pulsar"
    );
}

#[test]
fn unindexed_file_is_reported_as_data_only() {
    let (_dir, model, service) = setup_with(&["Use Kafka"]);
    let source = decision_path(&service, &model, "0001");
    let text = std::fs::read_to_string(&source)
        .unwrap()
        .replace("adr_id: '0001'", "adr_id: '0002'")
        .replace("title: Use Kafka", "title: Hand written");
    std::fs::write(model.join("AD0002-hand-written.md"), text).unwrap();

    assert!(matches!(
        service.validate_consistency(&model).unwrap_err(),
        ModelServiceError::MetadataMismatch { issues }
            if issues == [ConsistencyIssue::OnlyInData("0002".to_string())]
    ));
}

#[test]
fn content_validation_lists_missing_required_sections() {
    let (_dir, model, service) = setup_with(&["Use Kafka", "Pick database"]);
    assert_eq!(
        service.validate_content(&model).unwrap().checked,
        ["0001", "0002"]
    );

    let second = decision_path(&service, &model, "0002");
    let text = std::fs::read_to_string(&second).unwrap();
    std::fs::write(&second, text.replace("<a name=\"options\"></a> ", "")).unwrap();

    match service.validate_content(&model).unwrap_err() {
        ModelServiceError::ContentInvalid { issues } => {
            assert_eq!(issues.len(), 1);
            assert_eq!(issues[0].id, "0002");
            assert_eq!(issues[0].missing, [Section::Options]);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn validation_without_index_is_a_repo_error() {
    let (_dir, model, service) = setup_with(&["Use Kafka"]);
    std::fs::remove_file(model.join("index.yaml")).unwrap();

    assert!(!service.exists(&model));
    assert!(matches!(
        service.validate_content(&model).unwrap_err(),
        ModelServiceError::Repo(RepoError::Io { .. })
    ));
    assert!(matches!(
        service.validate_consistency(&model).unwrap_err(),
        ModelServiceError::Repo(RepoError::Io { .. })
    ));
}

#[test]
fn files_without_frontmatter_are_skipped_by_scans() {
    let (_dir, model, service) = setup_with(&["Use Kafka"]);
    std::fs::write(model.join("AD0002-draft-notes.md"), "just notes, no frontmatter\n").unwrap();
    std::fs::remove_file(model.join("index.yaml")).unwrap();

    let all = service.decisions().get_all(&model).unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].id, "0001");

    assert_eq!(service.rebuild_index(&model).unwrap(), 1);
    assert_eq!(service.validate_consistency(&model).unwrap().checked, ["0001"]);
}

#[test]
fn undecodable_frontmatter_still_fails_rebuild() {
    let (_dir, model, service) = setup_with(&["Use Kafka"]);
    let before = index_bytes(&model);
    std::fs::write(
        model.join("AD0002-broken.md"),
        "---\ntitle: [unclosed\n---\n## <a name=\"question\"></a> Question\n",
    )
    .unwrap();

    assert!(matches!(
        service.rebuild_index(&model).unwrap_err(),
        ModelServiceError::Repo(RepoError::MalformedDocument { .. })
    ));
    assert_eq!(index_bytes(&model), before);
}
