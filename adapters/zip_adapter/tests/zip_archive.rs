use coversheet_core::domain::NamedDocument;
use coversheet_core::ports::ArchiveWriter;
use std::io::{Cursor, Read};
use zip_adapter::ZipArchiveWriter;

fn documents() -> Vec<NamedDocument> {
    vec![
        NamedDocument {
            name: "156756.pdf".to_string(),
            bytes: b"%PDF-second-student".to_vec(),
        },
        NamedDocument {
            name: "151596.pdf".to_string(),
            bytes: b"%PDF-first-student".to_vec(),
        },
    ]
}

#[test]
fn entries_keep_input_order_and_content() {
    let bytes = ZipArchiveWriter::new()
        .assemble(&documents())
        .expect("assemble");

    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).expect("open zip archive");
    assert_eq!(archive.len(), 2);
    assert_eq!(archive.by_index(0).expect("first").name(), "156756.pdf");
    assert_eq!(archive.by_index(1).expect("second").name(), "151596.pdf");

    let mut content = Vec::new();
    archive
        .by_name("151596.pdf")
        .expect("entry")
        .read_to_end(&mut content)
        .expect("read entry");
    assert_eq!(content, b"%PDF-first-student");
}

#[test]
fn identical_input_gives_identical_archive() {
    let writer = ZipArchiveWriter::new();
    assert_eq!(
        writer.assemble(&documents()).unwrap(),
        writer.assemble(&documents()).unwrap()
    );
}

#[test]
fn name_collision_fails_the_archive() {
    let mut docs = documents();
    docs.push(docs[0].clone());
    let err = ZipArchiveWriter::new().assemble(&docs).unwrap_err();
    assert_eq!(err.kind(), "archive");
}
