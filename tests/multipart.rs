//! Framing characterization for the multipart encoder.

use rorschach_probe::FormData;

#[test]
fn text_part_is_crlf_framed_between_boundaries() {
    let body = FormData::with_boundary("XBOUND")
        .text("user_id", "alice")
        .finish();

    let expected = "--XBOUND\r\n\
         Content-Disposition: form-data; name=\"user_id\"\r\n\
         \r\n\
         alice\r\n\
         --XBOUND--\r\n";
    assert_eq!(std::str::from_utf8(&body).unwrap(), expected);
}

#[test]
fn file_part_declares_filename_and_content_type() {
    let body = FormData::with_boundary("XBOUND")
        .file("file", "rotate.json", "application/json", &b"{\"1\":0}"[..])
        .finish();

    let expected = "--XBOUND\r\n\
         Content-Disposition: form-data; name=\"file\"; filename=\"rotate.json\"\r\n\
         Content-Type: application/json\r\n\
         \r\n\
         {\"1\":0}\r\n\
         --XBOUND--\r\n";
    assert_eq!(std::str::from_utf8(&body).unwrap(), expected);
}

#[test]
fn parts_are_emitted_in_append_order() {
    let body = FormData::with_boundary("XBOUND")
        .text("first", "1")
        .text("second", "2")
        .finish();

    let text = std::str::from_utf8(&body).unwrap();
    let first = text.find("name=\"first\"").expect("first part present");
    let second = text.find("name=\"second\"").expect("second part present");
    assert!(first < second);
}

#[test]
fn closing_boundary_terminates_the_body() {
    let body = FormData::with_boundary("XBOUND")
        .text("user_id", "alice")
        .finish();
    assert!(body.ends_with(b"--XBOUND--\r\n"));
}

#[test]
fn content_type_header_carries_the_boundary() {
    let form = FormData::with_boundary("XBOUND");
    assert_eq!(form.content_type(), "multipart/form-data; boundary=XBOUND");
}

#[test]
fn quotes_in_part_names_are_escaped_in_the_disposition() {
    let body = FormData::with_boundary("XBOUND")
        .text("user\"id", "alice")
        .finish();

    let text = std::str::from_utf8(&body).unwrap();
    assert!(text.contains(r#"name="user%22id""#));
    assert!(!text.contains(r#"name="user"id""#));
}

#[test]
fn crlf_in_filenames_cannot_forge_part_headers() {
    let body = FormData::with_boundary("XBOUND")
        .file(
            "file",
            "evil\r\nX-Forged: 1.json",
            "application/json",
            &b"{}"[..],
        )
        .finish();

    let text = std::str::from_utf8(&body).unwrap();
    assert!(text.contains(r#"filename="evil%0D%0AX-Forged: 1.json""#));
    assert!(!text.contains("\r\nX-Forged"));
}

#[test]
fn crlf_in_text_values_is_preserved_as_content() {
    // Part content is boundary-delimited; line breaks in a value are data,
    // not framing.
    let body = FormData::with_boundary("XBOUND")
        .text("note", "line one\r\nline two")
        .finish();

    let expected = "--XBOUND\r\n\
         Content-Disposition: form-data; name=\"note\"\r\n\
         \r\n\
         line one\r\nline two\r\n\
         --XBOUND--\r\n";
    assert_eq!(std::str::from_utf8(&body).unwrap(), expected);
}

#[test]
fn fresh_forms_get_distinct_boundaries() {
    let first = FormData::new();
    let second = FormData::new();
    assert_ne!(first.boundary(), second.boundary());
}
