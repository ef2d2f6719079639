//! Integration tests for the editor operations, driven through the
//! in-memory engine.

use std::path::PathBuf;
use std::sync::Arc;

use serde_json::json;
use xmlwright_common::{FileSystem, MockFileSystem};
use xmlwright_editor::{
    DtdMapping, EditorConfig, EditorError, EditorResponse, EditorService, ElementKind, Fields,
    InMemoryEngine, Plugin, UserCtx, XmlDocument,
};

const DTD_URL: &str = "http://dtds/exercise.dtd";
const ROOT: &str = "/srv/accounts/bob";

fn exercise_dtd() -> DtdMapping {
    let mut mapping = DtdMapping::new();
    mapping.insert("Exercise".to_string(), ElementKind::Container);
    mapping.insert("comments".to_string(), ElementKind::Container);
    mapping.insert("mqm".to_string(), ElementKind::Text);
    mapping.insert("qcm".to_string(), ElementKind::Text);
    mapping.insert("test".to_string(), ElementKind::Container);
    mapping
}

struct Fixture {
    service: EditorService,
    engine: Arc<InMemoryEngine>,
    fs: Arc<MockFileSystem>,
}

impl Fixture {
    fn new() -> Self {
        Self::with_config(|config| config)
    }

    fn with_config(adjust: impl FnOnce(EditorConfig) -> EditorConfig) -> Self {
        let fs = Arc::new(MockFileSystem::new());
        let engine = Arc::new(InMemoryEngine::new(fs.clone()));
        engine.add_dtd(DTD_URL, exercise_dtd());
        let config = adjust(EditorConfig::new(vec![DTD_URL.to_string()]));
        let service = EditorService::new(engine.clone(), fs.clone(), config);
        Self {
            service,
            engine,
            fs,
        }
    }

    fn ctx(&self) -> UserCtx {
        UserCtx {
            login: "bob".to_string(),
            root: PathBuf::from(ROOT),
        }
    }

    fn register_exercise(&self, relative: &str) -> PathBuf {
        let path = PathBuf::from(ROOT).join(relative);
        let mut document = XmlDocument::new("Exercise", Some(DTD_URL));
        document.data = json!({ "number": "1" });
        self.engine.add_document(path.clone(), document);
        path
    }
}

fn content_of(response: &EditorResponse) -> String {
    match serde_json::to_value(response).unwrap().get("content") {
        Some(value) => value.as_str().unwrap_or_default().to_string(),
        None => panic!("response has no content key"),
    }
}

#[test]
fn test_open_requires_path() {
    let fixture = Fixture::new();
    let err = fixture.service.open(&fixture.ctx(), None, false).unwrap_err();
    assert_eq!(err.to_string(), "A filename should be provided");
    assert!(matches!(err, EditorError::MissingParameter(_)));
}

#[test]
fn test_open_renders_form_and_tree() {
    let fixture = Fixture::new();
    fixture.register_exercise("file1.xml");

    let response = fixture
        .service
        .open(&fixture.ctx(), Some("file1.xml"), false)
        .unwrap();
    let body = serde_json::to_value(&response).unwrap();
    let content = body["content"].as_str().unwrap();
    assert!(content.contains("data-action=\"/account/bob/xml/update.json\""));
    assert!(content.contains("data-paste-href=\"/account/bob/xml/paste.json\""));
    assert!(content.contains("id=\"xmltool-form\""));
    assert!(!content.contains("readonly=\"readonly\""));
    assert_eq!(body["jstree_data"]["tag"], "Exercise");
}

#[test]
fn test_open_iframe_is_read_only() {
    let fixture = Fixture::new();
    fixture.register_exercise("file1.xml");

    let response = fixture
        .service
        .open(&fixture.ctx(), Some("file1.xml"), true)
        .unwrap();
    assert!(content_of(&response).contains("readonly=\"readonly\""));
}

#[test]
fn test_open_reports_dtd_failure() {
    let fixture = Fixture::new();
    let path = PathBuf::from(ROOT).join("file1.xml");
    fixture.engine.add_document(
        path,
        XmlDocument::new("Exercise", Some("http://dtds/missing.dtd")),
    );

    let err = fixture
        .service
        .open(&fixture.ctx(), Some("file1.xml"), false)
        .unwrap_err();
    assert_eq!(err.to_string(), "The dtd of file1.xml can't be loaded.");
}

#[test]
fn test_open_degrades_to_text_editor_on_syntax_error() {
    let fixture = Fixture::new();
    // On disk but not parseable: open must answer with the text editor,
    // exactly as edit-text would, not with an error.
    fixture.fs.add_file(
        PathBuf::from(ROOT).join("broken.xml"),
        "<Exercise><number>1",
    );

    let opened = fixture
        .service
        .open(&fixture.ctx(), Some("broken.xml"), false)
        .unwrap();
    let as_text = fixture
        .service
        .open_as_text(&fixture.ctx(), Some("broken.xml"))
        .unwrap();
    assert_eq!(
        serde_json::to_value(&opened).unwrap(),
        serde_json::to_value(&as_text).unwrap()
    );
    let content = content_of(&opened);
    assert!(content.contains("class=\"codemirror\""));
    assert!(content.contains("data-action=\"/account/bob/xml/update-text.json\""));
}

#[test]
fn test_open_as_text_escapes_entities() {
    let fixture = Fixture::new();
    fixture
        .fs
        .add_file(PathBuf::from(ROOT).join("file1.xml"), "<Exercise/>");

    let response = fixture
        .service
        .open_as_text(&fixture.ctx(), Some("file1.xml"))
        .unwrap();
    let content = content_of(&response);
    assert!(content.contains("&lt;Exercise/&gt;"));
    assert!(content.contains("name=\"filename\" value=\"file1.xml\""));
}

#[test]
fn test_open_as_text_missing_file() {
    let fixture = Fixture::new();
    let err = fixture
        .service
        .open_as_text(&fixture.ctx(), Some("ghost.xml"))
        .unwrap_err();
    assert!(matches!(err, EditorError::Internal(_)));
}

#[test]
fn test_list_tags_sorted_and_idempotent() {
    let fixture = Fixture::new();
    for _ in 0..3 {
        let response = fixture.service.list_tags(Some(DTD_URL), false).unwrap();
        match response {
            EditorResponse::Tags { tags } => {
                assert_eq!(tags, vec!["Exercise", "comments", "mqm", "qcm", "test"]);
            }
            other => panic!("unexpected response: {other:?}"),
        }
    }
}

#[test]
fn test_list_tags_text_only() {
    let fixture = Fixture::new();
    let response = fixture.service.list_tags(Some(DTD_URL), true).unwrap();
    match response {
        EditorResponse::Tags { tags } => assert_eq!(tags, vec!["mqm", "qcm"]),
        other => panic!("unexpected response: {other:?}"),
    }
}

#[test]
fn test_list_tags_requires_url() {
    let fixture = Fixture::new();
    let err = fixture.service.list_tags(None, false).unwrap_err();
    assert_eq!(err.to_string(), "No dtd url given");
}

#[test]
fn test_create_new_without_parameters_prompts() {
    let fixture = Fixture::new();
    let response = fixture
        .service
        .create_new(&fixture.ctx(), None, None, None)
        .unwrap();
    match response {
        EditorResponse::Modal { modal } => {
            assert!(modal.contains("<h4 class=\"modal-title\">New file</h4>"));
            assert!(modal.contains(DTD_URL));
        }
        other => panic!("unexpected response: {other:?}"),
    }
}

#[test]
fn test_create_new_from_dtd_tag() {
    let fixture = Fixture::new();
    let response = fixture
        .service
        .create_new(&fixture.ctx(), None, Some(DTD_URL), Some("Exercise"))
        .unwrap();
    let content = content_of(&response);
    assert!(content.contains("name=\"_xml_filename\" id=\"_xml_filename\" value=\"\""));
}

#[test]
fn test_create_new_incomplete_parameters() {
    let fixture = Fixture::new();
    let err = fixture
        .service
        .create_new(&fixture.ctx(), None, None, Some("Exercise"))
        .unwrap_err();
    assert_eq!(err.to_string(), "Can't create new XML");
    assert!(matches!(err, EditorError::Creation));
}

#[test]
fn test_create_new_unknown_tag() {
    let fixture = Fixture::new();
    let err = fixture
        .service
        .create_new(&fixture.ctx(), None, Some(DTD_URL), Some("Blah"))
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "Invalid dtd element: Blah (http://dtds/exercise.dtd)"
    );
}

#[test]
fn test_create_new_from_template() {
    let fixture = Fixture::new();
    fixture.register_exercise("template.xml");
    let response = fixture
        .service
        .create_new(&fixture.ctx(), Some("template.xml"), None, None)
        .unwrap();
    assert!(content_of(&response).contains("id=\"xmltool-form\""));
}

#[test]
fn test_save_requires_filename() {
    let fixture = Fixture::new();
    let err = fixture.service.save(&fixture.ctx(), &vec![]).unwrap_err();
    assert_eq!(err.to_string(), "No filename given");
    assert!(fixture.engine.update_calls().is_empty());
}

#[test]
fn test_save_rejects_missing_extension() {
    let fixture = Fixture::new();
    let fields = vec![("_xml_filename".to_string(), "test".to_string())];
    let err = fixture.service.save(&fixture.ctx(), &fields).unwrap_err();
    assert_eq!(err.to_string(), "No filename extension. It should be '.xml'");
    assert!(fixture.engine.update_calls().is_empty());
}

#[test]
fn test_save_rejects_wrong_extension() {
    let fixture = Fixture::new();
    let fields = vec![("_xml_filename".to_string(), "test.doc".to_string())];
    let err = fixture.service.save(&fixture.ctx(), &fields).unwrap_err();
    assert_eq!(
        err.to_string(),
        "Bad filename extension '.doc'. It should be '.xml'"
    );
    assert!(fixture.engine.update_calls().is_empty());
}

#[test]
fn test_save_writes_through_engine() {
    let fixture = Fixture::new();
    let path = fixture.register_exercise("test.xml");
    let fields = vec![
        ("_xml_filename".to_string(), "test.xml".to_string()),
        ("Exercise:number".to_string(), "4".to_string()),
    ];
    let response = fixture.service.save(&fixture.ctx(), &fields).unwrap();
    match response {
        EditorResponse::Updated { msg } => assert_eq!(msg, "File updated"),
        other => panic!("unexpected response: {other:?}"),
    }
    assert_eq!(fixture.engine.update_calls(), vec![path]);
}

#[test]
fn test_save_applies_pre_write_transform() {
    let fixture = Fixture::with_config(|mut config| {
        config.pre_write_transform = Some(Arc::new(|s: &str| s.to_uppercase()));
        config
    });
    let path = fixture.register_exercise("test.xml");
    let fields = vec![
        ("_xml_filename".to_string(), "test.xml".to_string()),
        ("Exercise:number".to_string(), "4".to_string()),
    ];
    fixture.service.save(&fixture.ctx(), &fields).unwrap();
    let written = fixture.fs.read_to_string(&path).unwrap();
    assert_eq!(written, written.to_uppercase());
}

#[test]
fn test_save_reports_dtd_failure() {
    let fixture = Fixture::new();
    let path = PathBuf::from(ROOT).join("test.xml");
    fixture.engine.add_document(
        path,
        XmlDocument::new("Exercise", Some("http://dtds/missing.dtd")),
    );
    let fields = vec![("_xml_filename".to_string(), "test.xml".to_string())];
    let err = fixture.service.save(&fixture.ctx(), &fields).unwrap_err();
    assert_eq!(err.to_string(), "The dtd of test.xml can't be loaded.");
}

#[test]
fn test_save_text_requires_both_parameters() {
    let fixture = Fixture::new();
    let err = fixture
        .service
        .save_text(&fixture.ctx(), Some("test.xml"), None, false)
        .unwrap_err();
    assert_eq!(err.to_string(), "Missing parameters!");
    let err = fixture
        .service
        .save_text(&fixture.ctx(), None, Some("<Exercise/>"), false)
        .unwrap_err();
    assert_eq!(err.to_string(), "Missing parameters!");
}

#[test]
fn test_save_text_validates_xml_content() {
    let fixture = Fixture::new();
    let err = fixture
        .service
        .save_text(&fixture.ctx(), Some("test.xml"), Some("no markup here"), false)
        .unwrap_err();
    assert!(matches!(err, EditorError::Internal(_)));
    assert!(!fixture.fs.exists(&PathBuf::from(ROOT).join("test.xml")));
}

#[test]
fn test_save_text_writes_and_acknowledges() {
    let fixture = Fixture::new();
    let response = fixture
        .service
        .save_text(&fixture.ctx(), Some("test.xml"), Some("<Exercise/>"), false)
        .unwrap();
    match response {
        EditorResponse::Updated { msg } => assert_eq!(msg, "File updated"),
        other => panic!("unexpected response: {other:?}"),
    }
    assert_eq!(
        fixture
            .fs
            .read_to_string(&PathBuf::from(ROOT).join("test.xml"))
            .unwrap(),
        "<Exercise/>"
    );
}

#[test]
fn test_save_text_commit_prompts_for_message() {
    let fixture = Fixture::new();
    let response = fixture
        .service
        .save_text(&fixture.ctx(), Some("test.xml"), Some("<Exercise/>"), true)
        .unwrap();
    match response {
        EditorResponse::Modal { modal } => assert!(modal.contains("Commit message")),
        other => panic!("unexpected response: {other:?}"),
    }
    // The save still happened.
    assert!(fixture.fs.exists(&PathBuf::from(ROOT).join("test.xml")));
}

#[test]
fn test_save_text_any_extension_without_validation() {
    let fixture = Fixture::new();
    let response = fixture
        .service
        .save_text(&fixture.ctx(), Some("notes.txt"), Some("not xml at all"), false)
        .unwrap();
    assert!(matches!(response, EditorResponse::Updated { .. }));
    assert_eq!(
        fixture
            .fs
            .read_to_string(&PathBuf::from(ROOT).join("notes.txt"))
            .unwrap(),
        "not xml at all"
    );
}

#[test]
fn test_add_element_requires_both_parameters() {
    let fixture = Fixture::new();
    let err = fixture
        .service
        .add_element(Some("Exercise"), None, &vec![])
        .unwrap_err();
    assert_eq!(err.to_string(), "Bad parameter");
    let err = fixture
        .service
        .add_element(None, Some(DTD_URL), &vec![])
        .unwrap_err();
    assert!(matches!(err, EditorError::BadParameter));
}

#[test]
fn test_add_element_default_data() {
    let fixture = Fixture::new();
    let response = fixture
        .service
        .add_element(Some("Exercise"), Some(DTD_URL), &vec![])
        .unwrap();
    match response {
        EditorResponse::Element(value) => assert_eq!(value["elt_id"], "Exercise"),
        other => panic!("unexpected response: {other:?}"),
    }
}

struct QcmPlugin;

impl Plugin for QcmPlugin {
    fn matches(&self, elt_id: &str, _dtd_url: &str) -> bool {
        elt_id.starts_with("qcm")
    }

    fn handle(
        &self,
        elt_id: &str,
        _dtd_url: &str,
        _fields: &Fields,
    ) -> Result<serde_json::Value, EditorError> {
        Ok(json!({ "elt_id": elt_id, "html": "<div>custom qcm</div>" }))
    }
}

#[test]
fn test_add_element_plugin_takes_precedence() {
    let fixture = Fixture::with_config(|mut config| {
        config.plugins.push(Arc::new(QcmPlugin));
        config
    });
    let response = fixture
        .service
        .add_element(Some("qcm:1"), Some(DTD_URL), &vec![])
        .unwrap();
    match response {
        EditorResponse::Element(value) => assert_eq!(value["html"], "<div>custom qcm</div>"),
        other => panic!("unexpected response: {other:?}"),
    }
}

#[test]
fn test_copy_requires_element_id() {
    let fixture = Fixture::new();
    let err = fixture.service.copy_element(None, &vec![]).unwrap_err();
    assert!(matches!(err, EditorError::BadParameter));
}

#[test]
fn test_copy_then_paste_roundtrip() {
    let fixture = Fixture::new();
    let fields = vec![(
        "Exercise:number:_value".to_string(),
        "Hello world".to_string(),
    )];

    let (entry, response) = fixture
        .service
        .copy_element(Some("Exercise:number"), &fields)
        .unwrap();
    match response {
        EditorResponse::Info { info_msg } => assert_eq!(info_msg, "Copied"),
        other => panic!("unexpected response: {other:?}"),
    }

    let pasted = fixture
        .service
        .paste_element(Some("Exercise"), Some(DTD_URL), &vec![], Some(&entry))
        .unwrap();
    match pasted {
        EditorResponse::Element(value) => {
            assert_eq!(value["elt_id"], "Exercise:number");
            assert_eq!(value["fields"]["Exercise:number:_value"], "Hello world");
        }
        other => panic!("unexpected response: {other:?}"),
    }

    std::fs::remove_file(&entry.path).unwrap();
}

#[test]
fn test_paste_without_copy_is_empty_clipboard() {
    let fixture = Fixture::new();
    let err = fixture
        .service
        .paste_element(Some("Exercise"), Some(DTD_URL), &vec![], None)
        .unwrap_err();
    assert_eq!(err.to_string(), "Empty clipboard");
}

#[test]
fn test_paste_incompatible_shapes() {
    let fixture = Fixture::new();
    let fields = vec![("Exercise".to_string(), "whole document".to_string())];
    let (entry, _) = fixture
        .service
        .copy_element(Some("Exercise"), &fields)
        .unwrap();

    let err = fixture
        .service
        .paste_element(Some("Exercise"), Some(DTD_URL), &vec![], Some(&entry))
        .unwrap_err();
    assert_eq!(err.to_string(), "The element can't be pasted here");

    std::fs::remove_file(&entry.path).unwrap();
}

#[test]
fn test_paste_requires_parameters() {
    let fixture = Fixture::new();
    let err = fixture
        .service
        .paste_element(Some("Exercise"), None, &vec![], None)
        .unwrap_err();
    assert!(matches!(err, EditorError::BadParameter));
}

#[test]
fn test_last_copy_wins() {
    let fixture = Fixture::new();
    let first = vec![("Exercise:number:_value".to_string(), "first".to_string())];
    let second = vec![("Exercise:number:_value".to_string(), "second".to_string())];

    let (old_entry, _) = fixture
        .service
        .copy_element(Some("Exercise:number"), &first)
        .unwrap();
    let (new_entry, _) = fixture
        .service
        .copy_element(Some("Exercise:number"), &second)
        .unwrap();

    let pasted = fixture
        .service
        .paste_element(Some("Exercise"), Some(DTD_URL), &vec![], Some(&new_entry))
        .unwrap();
    match pasted {
        EditorResponse::Element(value) => {
            assert_eq!(value["fields"]["Exercise:number:_value"], "second");
        }
        other => panic!("unexpected response: {other:?}"),
    }

    std::fs::remove_file(&old_entry.path).unwrap();
    std::fs::remove_file(&new_entry.path).unwrap();
}

#[test]
fn test_comment_modal_embeds_comment() {
    let fixture = Fixture::new();
    let response = fixture.service.comment_modal(Some("a <note>"));
    let content = content_of(&response);
    assert!(content.contains("a &lt;note&gt;"));

    let empty = fixture.service.comment_modal(None);
    assert!(content_of(&empty).contains("<div class=\"modal "));
}

#[test]
fn test_path_traversal_is_rejected() {
    let fixture = Fixture::new();
    let err = fixture
        .service
        .open(&fixture.ctx(), Some("../alice/file1.xml"), false)
        .unwrap_err();
    assert!(matches!(err, EditorError::Internal(_)));
}
