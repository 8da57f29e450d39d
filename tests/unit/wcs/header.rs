use super::*;

fn fixed_cards(cards: &[&str]) -> Vec<u8> {
    let mut out = Vec::new();
    for c in cards {
        let mut card = format!("{c:<80}");
        card.truncate(80);
        out.extend_from_slice(card.as_bytes());
    }
    out
}

#[test]
fn text_header_parses_values_and_comments() {
    let h = FitsHeader::parse(
        b"CTYPE1  = 'RA---TAN-SIP' / projection\n\
          CRVAL1  = 150.25 / deg\n\
          NAXIS1  = 2048\n\
          CD1_1   = -1.5D-4\n\
          SIMPLE  = T\n\
          COMMENT = not a card\n\
          END\n\
          CRVAL2  = 1.0\n",
    );
    assert_eq!(h.str("CTYPE1"), Some("RA---TAN-SIP"));
    assert_eq!(h.f64("CRVAL1"), Some(150.25));
    assert_eq!(h.f64("NAXIS1"), Some(2048.0));
    assert_eq!(h.f64("CD1_1"), Some(-1.5e-4));
    assert_eq!(h.get("SIMPLE"), Some(&HeaderValue::Bool(true)));
    assert!(h.get("COMMENT").is_none());
    assert!(h.get("CRVAL2").is_none(), "cards after END are ignored");
}

fn fits_file(name: &str, cards: &[&str]) -> std::path::PathBuf {
    let path = std::env::temp_dir().join(format!(
        "skyplot_header_{name}_{}.fits",
        std::process::id()
    ));
    let mut bytes = fixed_cards(&[
        "SIMPLE  =                    T",
        "BITPIX  =                    8",
        "NAXIS   =                    0",
    ]);
    bytes.extend(fixed_cards(cards));
    bytes.extend(fixed_cards(&["END"]));
    bytes.resize(2880, b' ');
    std::fs::write(&path, bytes).unwrap();
    path
}

#[test]
fn fits_detection_needs_a_fixed_first_card() {
    let fits = fixed_cards(&["SIMPLE  =                    T", "END"]);
    assert!(FitsHeader::is_fits(&fits));
    assert!(!FitsHeader::is_fits(b"SIMPLE  = T\nEND\n"));
    assert!(!FitsHeader::is_fits(&fixed_cards(&["CRPIX1  =                  1.0"])));
}

#[test]
fn fits_files_are_read_through_cfitsio() {
    let path = fits_file(
        "sip",
        &[
            "CTYPE1  = 'RA---TAN-SIP'",
            "CTYPE2  = 'DEC--TAN-SIP'",
            "CRPIX1  =                512.5 / ref pixel",
            "CRVAL1  =                150.0",
            "CD1_1   =              -0.0002",
            "A_ORDER =                    2",
            "A_2_0   =               1.0E-6",
            "OBJECT  = 'O''Neil field'",
        ],
    );
    let h = FitsHeader::read_fits(&path).unwrap();
    assert_eq!(h.str("CTYPE1"), Some("RA---TAN-SIP"));
    assert_eq!(h.f64("CRPIX1"), Some(512.5));
    assert_eq!(h.f64("CD1_1"), Some(-2.0e-4));
    assert_eq!(h.f64("A_ORDER"), Some(2.0));
    assert_eq!(h.f64("A_2_0"), Some(1.0e-6));
    assert!(h.f64("CRVAL2").is_none());
    // Only WCS keywords are collected.
    assert!(h.get("OBJECT").is_none());
    let _ = std::fs::remove_file(&path);
}

#[test]
fn fits_and_text_headers_load_the_same_projection() {
    let cards = [
        "CTYPE1  = 'RA---TAN'",
        "CTYPE2  = 'DEC--TAN'",
        "CRVAL1  =                 83.8",
        "CRVAL2  =                 -5.4",
        "CRPIX1  =                 50.5",
        "CRPIX2  =                 40.5",
        "CD1_1   =               -0.001",
        "CD2_2   =                0.001",
    ];
    let fits = fits_file("tan", &cards);
    let text = fits.with_extension("hdr");
    std::fs::write(&text, cards.join("\n")).unwrap();

    let a = crate::wcs::load_projection(&fits).unwrap();
    let b = crate::wcs::load_projection(&text).unwrap();
    assert_eq!(a, b);
    assert_eq!(a.crpix(), crate::foundation::core::Point::new(49.5, 39.5));
    let _ = std::fs::remove_file(&fits);
    let _ = std::fs::remove_file(&text);
}

#[test]
fn unreadable_fits_is_a_config_error() {
    let path = std::env::temp_dir().join(format!("skyplot_header_bad_{}.fits", std::process::id()));
    let mut bytes = fixed_cards(&["SIMPLE  =                    T"]);
    bytes.extend_from_slice(b"garbage");
    std::fs::write(&path, bytes).unwrap();
    let err = crate::wcs::load_projection(&path).unwrap_err();
    assert!(err.is_config());
    let _ = std::fs::remove_file(&path);
}

#[test]
fn empty_or_unparseable_input_yields_no_cards() {
    assert!(FitsHeader::parse(b"").is_empty());
    assert!(FitsHeader::parse(b"just some text\nwithout cards").is_empty());
    assert!(FitsHeader::parse(b"BAD = 'unterminated").is_empty());
}
