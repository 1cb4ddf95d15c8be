//! Library-level highlighting tests over files on disk.

use std::cell::RefCell;
use std::fs;
use std::path::PathBuf;
use std::rc::Rc;

use tempfile::TempDir;
use tracklight::datafile::Datafile;
use tracklight::tokenize::Grammar;
use tracklight::xml_parser::{self, XmlPart};
use tracklight::{combine_tokens, HighlightError, HighlightedFile, SpanGroup};
use tracklight_core::level::LevelRegistry;
use tracklight_core::models::{HighlightLevel, MeasurementRef};
use tracklight_core::store::memory::InMemoryExtractionStore;
use tracklight_core::store::ExtractionStore;

const REPLAY: &str = "\
951212 050000.000 NELSON   @C   22 10 53.54 N 021 54 20.14 W 269.7   2.0      0
951212 050100.000 NELSON   @C   22 10 53.34 N 021 54 22.05 W 269.7   2.0      0
;TEXT: CA 951212 050200.000 NELSON Waypoint reached
951212 050300.000 NELSON   @C   22 10 53.14 N 021 54 23.96 W 269.7   2.0      0
";

const CSV: &str = "\
Timestamp,Name,Lat,Long,Course,Speed
2019-01-01T12:00:00Z,\"ALPHA, BETA\",50.1,-1.2,90.0,12.5
";

fn write_fixture(name: &str, contents: &str) -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join(name);
    fs::write(&path, contents).unwrap();
    (tmp, path)
}

#[test]
fn test_highlight_replay_file_and_export() {
    let (tmp, path) = write_fixture("rep_test1.rep", REPLAY);
    let hf = HighlightedFile::open(&path);
    let lines = hf.lines().unwrap();
    assert_eq!(lines.len(), 4);

    for line in &lines {
        let tokens = line.whitespace_tokens();
        if tokens[0].text().starts_with(';') {
            line.record("Replay Comment Importer", "comment", "Waypoint reached", None)
                .unwrap();
            continue;
        }
        let timestamp = combine_tokens(&[&tokens[0], &tokens[1]]).unwrap();
        timestamp
            .record("Replay Importer", "timestamp", "1995-12-12T05:00:00", None)
            .unwrap();
        tokens[2].record("Replay Importer", "vessel name", "NELSON", None).unwrap();
        tokens[12].record("Replay Importer", "heading", 269.7, Some("degrees")).unwrap();
    }

    let out = tmp.path().join("out").join("rep_test1.html");
    hf.export(&out, true).unwrap();
    let html = fs::read_to_string(&out).unwrap();
    assert!(html.starts_with("<html>"));
    assert!(html.contains("Replay Importer/vessel name, Value:NELSON"));
    assert!(html.contains("Value:269.7 Units:degrees"));
    assert!(html.contains("Replay Comment Importer/comment"));
    assert!(html.contains("<li>"));
    assert!(html.trim_end().ends_with("</html>"));
}

#[test]
fn test_line_limit_restricts_lines_and_store() {
    let (_tmp, path) = write_fixture("rep_test1.rep", REPLAY);
    let hf = HighlightedFile::builder(&path).line_limit(2).build();
    let lines = hf.lines().unwrap();
    assert_eq!(lines.len(), 2);
    lines[1].record("Replay Importer", "line", "x", None).unwrap();

    let first_two: usize = REPLAY.lines().take(2).map(|l| l.chars().count()).sum();
    assert_eq!(hf.char_count(), first_two + 1);

    let rebuilt: Vec<String> = lines.iter().map(|l| l.text()).collect();
    let expected: Vec<&str> = REPLAY.lines().take(2).collect();
    assert_eq!(rebuilt.join("\n"), expected.join("\n"));
}

#[test]
fn test_limit_larger_than_file_returns_all_lines() {
    let (_tmp, path) = write_fixture("rep_test1.rep", REPLAY);
    let hf = HighlightedFile::builder(&path).line_limit(200).build();
    assert_eq!(hf.lines().unwrap().len(), 4);
}

#[test]
fn test_non_positive_limit_fails_on_lines() {
    let (_tmp, path) = write_fixture("rep_test1.rep", REPLAY);
    let hf = HighlightedFile::builder(&path).line_limit(-1).build();
    assert!(matches!(hf.lines(), Err(HighlightError::Configuration(_))));
}

#[test]
fn test_csv_quoted_field_with_comma() {
    let (_tmp, path) = write_fixture("track.csv", CSV);
    let hf = HighlightedFile::open(&path);
    let lines = hf.lines().unwrap();
    let tokens = lines[1].csv_tokens();
    let texts: Vec<String> = tokens.iter().map(|t| t.text()).collect();
    assert_eq!(texts.len(), 6);
    assert_eq!(texts[0], "2019-01-01T12:00:00Z");
    assert_eq!(texts[4], "90.0");
}

#[test]
fn test_custom_grammar_tokens() {
    let hf = HighlightedFile::from_text("$GPGGA;123519;4807.038;N");
    let grammar = Grammar::Custom(regex::Regex::new(r"[^;]+").unwrap());
    let lines = hf.lines().unwrap();
    let tokens = lines[0].tokens(&grammar, None);
    assert_eq!(tokens.len(), 4);
    assert_eq!(tokens[2].start(), Some(14));
}

#[tokio::test]
async fn test_database_level_persists_grouped_extractions() {
    let (_tmp, path) = write_fixture("rep_test1.rep", REPLAY);
    let datafile = Datafile::for_path(&path).unwrap().shared();
    let levels = LevelRegistry::default().with("Replay Importer", HighlightLevel::PersistAndRender);
    let hf = HighlightedFile::builder(&path)
        .levels(levels)
        .datafile(Rc::clone(&datafile))
        .build();

    for (i, line) in hf.lines().unwrap().iter().enumerate() {
        let tokens = line.whitespace_tokens();
        if tokens[0].text().starts_with(';') {
            continue;
        }
        datafile
            .borrow_mut()
            .set_current_measurement_object(MeasurementRef::new("States", (i + 1).to_string()));
        tokens[2].record("Replay Importer", "vessel name", "NELSON", None).unwrap();
        tokens[13].record("Replay Importer", "speed", 2.0, Some("knots")).unwrap();
        datafile.borrow_mut().flush_extracted_tokens();
    }

    let batch = datafile.borrow().commit_batch();
    let store = InMemoryExtractionStore::new();
    assert_eq!(batch.commit(&store).await.unwrap(), 6);

    let id = datafile.borrow().id().to_string();
    let rows = store.extractions_for_datafile(&id).await.unwrap();
    assert_eq!(rows.len(), 6);
    assert_eq!(rows[0].text_location, "18-24");

    let fourth = store.extractions_for_entry("States", "4").await.unwrap();
    assert_eq!(fourth.len(), 2);
    assert_eq!(fourth[1].field, "speed");
}

#[test]
fn test_gpx_element_offsets_and_record() {
    let gpx = "<?xml version=\"1.0\"?>\n<gpx version=\"1.1\">\n  <trk>\n    <name>NELSON</name>\n    <trkseg>\n      <trkpt lat=\"22.1\" lon=\"-21.9\">\n        <time>2012-04-27T15:29:38Z</time>\n        <course>268.7</course>\n      </trkpt>\n    </trkseg>\n  </trk>\n</gpx>\n";
    let (_tmp, path) = write_fixture("track.gpx", gpx);
    let datafile: Rc<RefCell<Datafile>> = Datafile::for_path(&path).unwrap().shared();
    let hf = HighlightedFile::builder(&path)
        .datafile(Rc::clone(&datafile))
        .build();
    let doc = xml_parser::parse(&hf).unwrap();

    let point = doc.root().find_all("trkpt").remove(0);
    assert_eq!(point.line_number(), 6);
    point
        .record("GPX Importer", "location", "22.1,-21.9", None, XmlPart::Opening)
        .unwrap();
    let name = doc.root().find_all("name").remove(0);
    let (start, end) = name
        .record("GPX Importer", "name", "NELSON", None, XmlPart::Text)
        .unwrap();

    let chars = hf.chars();
    let named: String = chars[start..end].iter().map(|c| c.letter).collect();
    assert_eq!(named, "NELSON");
    let df = datafile.borrow();
    assert_eq!(df.pending_extracted_tokens.len(), 2);
    assert_eq!(
        df.pending_extracted_tokens[0].text,
        "<trkpt lat=\"22.1\" lon=\"-21.9\">"
    );
}

#[test]
fn test_xml_part_string_is_validated() {
    assert!(matches!(
        "closing".parse::<XmlPart>(),
        Err(HighlightError::InvalidXmlPart(_))
    ));
}
