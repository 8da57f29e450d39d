use super::*;

#[test]
fn display_prefixes_are_stable() {
    assert!(
        SkyplotError::config("x")
            .to_string()
            .contains("configuration error:")
    );
    assert!(SkyplotError::load("x").to_string().contains("load error:"));
    assert!(
        SkyplotError::render("x")
            .to_string()
            .contains("render error:")
    );
}

#[test]
fn other_preserves_source() {
    let base = std::io::Error::other("boom");
    let err = SkyplotError::Other(anyhow::Error::new(base));
    assert!(err.to_string().contains("boom"));
    assert!(!err.is_config());
}

#[test]
fn config_errors_are_classified() {
    assert!(SkyplotError::config("bad grid").is_config());
    assert!(!SkyplotError::load("bad png").is_config());
}
