use super::*;

#[test]
fn parses_dimensions_in_either_case() {
    assert_eq!("10x10x5".parse(), Ok(YardDimensions::default()));
    assert_eq!(" 20 X 8 x 3 ".parse(), Ok(YardDimensions::new(20, 8, 3)));
}

#[test]
fn rejects_malformed_dimensions() {
    for raw in ["", "10x10", "10x10x5x1", "0x10x5", "ax10x5", "-1x10x5"] {
        assert_eq!(
            raw.parse::<YardDimensions>(),
            Err(ParseDimensionsError(raw.to_string())),
            "{raw}"
        );
    }
}

#[test]
fn bounds_are_exclusive_upper_limits() {
    let dims = YardDimensions::default();
    assert!(dims.contains(Position::new(0, 0, 0)));
    assert!(dims.contains(Position::new(9, 9, 4)));
    assert!(!dims.contains(Position::new(10, 0, 0)));
    assert!(!dims.contains(Position::new(0, 0, 5)));
    assert!(!dims.contains(Position::new(-1, 0, 0)));
    assert_eq!(dims.capacity(), 500);
    assert_eq!(dims.to_string(), "10x10x5");
}

#[test]
fn container_wire_shape() {
    let container: Container =
        serde_json::from_str(r#"{"id":"C001","position":{"x":1,"y":2,"z":0}}"#).expect("decode");
    assert_eq!(container, Container::new("C001", Position::new(1, 2, 0)));
    assert_eq!(container.position.to_string(), "(1, 2, 0)");
}
