use jail_conn::http::parser::{
    parse_cookies, parse_header_block, parse_header_line, parse_request_line, process_headers,
};
use jail_conn::http::request::Request;
use jail_conn::http::response::StatusCode;

#[test]
fn test_parse_request_line_tokens() {
    let mut req = Request::default();
    parse_request_line("POST /jail/run HTTP/1.0", &mut req).unwrap();

    assert_eq!(req.method, "POST");
    assert_eq!(req.url, "/jail/run");
    assert_eq!(req.version, "HTTP/1.0");
    assert_eq!(req.request_line(), "POST /jail/run HTTP/1.0");
}

#[test]
fn test_request_line_round_trips() {
    for line in [
        "GET / HTTP/1.1",
        "OPTIONS * HTTP/1.1",
        "PROPFIND /dav/x?depth=1 HTTP/1.1",
        "GET http://jail:8080/monitor?k=v HTTP/1.0",
    ] {
        let mut req = Request::default();
        parse_request_line(line, &mut req).unwrap();
        assert_eq!(req.request_line(), line);
    }
}

#[test]
fn test_parse_absolute_url() {
    let mut req = Request::default();
    parse_request_line("GET https://jail.example/run?id=7&x= HTTP/1.1", &mut req).unwrap();

    assert_eq!(req.protocol, "https");
    assert_eq!(req.path, "/run");
    assert_eq!(req.query, "id=7&x=");
}

#[test]
fn test_parse_url_without_query() {
    let mut req = Request::default();
    parse_request_line("GET /available HTTP/1.1", &mut req).unwrap();

    assert_eq!(req.protocol, "");
    assert_eq!(req.path, "/available");
    assert_eq!(req.query, "");
}

#[test]
fn test_malformed_request_line() {
    for line in ["GET /", "GET / HTTP/1.1 extra", "GET  / HTTP/1.1", ""] {
        let mut req = Request::default();
        let err = parse_request_line(line, &mut req).unwrap_err();
        assert_eq!(err.status(), StatusCode::BadRequest);
        assert_eq!(err.context(), Some(line));
    }
}

#[test]
fn test_header_name_is_uppercased() {
    let (name, value) = parse_header_line("Content-Type:  application/json ").unwrap();

    assert_eq!(name, "CONTENT-TYPE");
    assert_eq!(value, "application/json");
}

#[test]
fn test_malformed_header() {
    let err = process_headers("GET / HTTP/1.1\r\nBrokenHeader\r\n\r\n").unwrap_err();

    assert_eq!(err.status(), StatusCode::BadRequest);
    assert_eq!(err.message(), "Erroneous header");
    assert_eq!(err.context(), Some("BrokenHeader"));
}

#[test]
fn test_duplicate_header_last_wins() {
    let req = process_headers("GET / HTTP/1.1\r\nX-Id: 1\r\nx-id: 2\r\n\r\n").unwrap();

    assert_eq!(req.headers.len(), 1);
    assert_eq!(req.header("X-ID"), "2");
}

#[test]
fn test_leading_blank_lines_are_skipped() {
    let req = process_headers("\r\n\r\nGET /x HTTP/1.1\r\nHost: a\r\n\r\n").unwrap();

    assert_eq!(req.path, "/x");
    assert_eq!(req.header("host"), "a");
}

#[test]
fn test_headers_stop_at_blank_line() {
    let req = process_headers("GET / HTTP/1.1\r\nA: 1\r\n\r\nB: 2\r\n").unwrap();

    assert_eq!(req.header("A"), "1");
    assert_eq!(req.header("B"), "");
}

#[test]
fn test_headers_end_at_end_of_input() {
    let req = process_headers("GET / HTTP/1.1\nA: 1").unwrap();

    assert_eq!(req.header("a"), "1");
}

#[test]
fn test_parse_cookies() {
    let cookies = parse_cookies("session=abc123; lang=en").unwrap();

    assert_eq!(cookies.len(), 2);
    assert_eq!(cookies["session"], "abc123");
    assert_eq!(cookies["lang"], "en");
}

#[test]
fn test_repeated_cookie_rejected_even_with_same_value() {
    for value in ["a=1; a=2", "a=1; a=1", "a=1; b=2; a=3"] {
        let err = parse_cookies(value).unwrap_err();
        assert_eq!(err.status(), StatusCode::BadRequest);
        assert_eq!(err.context(), Some(value));
    }
}

#[test]
fn test_cookie_header_fills_cookie_map() {
    let req = process_headers("GET / HTTP/1.1\r\ncookie: a=1; b=2\r\n\r\n").unwrap();

    assert_eq!(req.cookie("a"), "1");
    assert_eq!(req.cookie("b"), "2");
    assert_eq!(req.header("Cookie"), "a=1; b=2");
}

#[test]
fn test_parsing_is_idempotent() {
    let block = b"GET /run?id=7 HTTP/1.1\r\nHost: x\r\nCookie: a=1; b=2\r\n\r\n";

    let first = parse_header_block(block).unwrap();
    let second = parse_header_block(block).unwrap();

    assert_eq!(first, second);
}

#[test]
fn test_invalid_utf8_is_bad_request() {
    let err = parse_header_block(b"GET /\xff HTTP/1.1\r\n\r\n").unwrap_err();

    assert_eq!(err.code(), 400);
}
