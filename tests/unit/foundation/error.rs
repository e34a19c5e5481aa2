use super::*;

#[test]
fn display_prefixes_are_stable() {
    assert!(
        CurvefxError::validation("x")
            .to_string()
            .contains("validation error:")
    );
    assert!(
        CurvefxError::history("x")
            .to_string()
            .contains("history error:")
    );
    assert!(
        CurvefxError::serde("x")
            .to_string()
            .contains("serialization error:")
    );
}

#[test]
fn other_preserves_source() {
    let base = std::io::Error::other("boom");
    let err = CurvefxError::Other(anyhow::Error::new(base));
    assert!(err.to_string().contains("boom"));
}
