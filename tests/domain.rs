use assert_matches::assert_matches;

use scry_dl::domain::{Quality, SetCode, SetSelection};
use scry_dl::error::ScryError;

#[test]
fn parse_set_selection() {
    assert_eq!("ALL".parse::<SetSelection>().unwrap(), SetSelection::All);
    assert_eq!(" all ".parse::<SetSelection>().unwrap(), SetSelection::All);

    let selection: SetSelection = " DOM, war,,m21 ".parse().unwrap();
    let codes = match selection {
        SetSelection::Codes(codes) => codes,
        SetSelection::All => panic!("expected explicit codes"),
    };
    let codes = codes.iter().map(SetCode::as_str).collect::<Vec<_>>();
    assert_eq!(codes, vec!["dom", "war", "m21"]);
}

#[test]
fn reject_empty_set_codes() {
    assert_matches!(" , ".parse::<SetSelection>(), Err(ScryError::InvalidSetCode(_)));
    assert_matches!("".parse::<SetCode>(), Err(ScryError::InvalidSetCode(_)));
}

#[test]
fn odd_set_codes_survive_parsing() {
    let selection: SetSelection = "dom,ZZ-Z".parse().unwrap();
    let SetSelection::Codes(codes) = selection else {
        panic!("expected explicit codes");
    };
    let codes = codes.iter().map(SetCode::as_str).collect::<Vec<_>>();
    assert_eq!(codes, vec!["dom", "zz-z"]);
}

#[test]
fn parse_quality() {
    assert_eq!("LARGE".parse::<Quality>().unwrap(), Quality::Large);
    assert_eq!("small".parse::<Quality>().unwrap(), Quality::Small);
    assert_matches!("png".parse::<Quality>(), Err(ScryError::InvalidQuality(_)));
}

#[test]
fn fallback_chain_starts_with_preference() {
    assert_eq!(
        Quality::Small.fallback_chain(),
        [Quality::Small, Quality::Normal, Quality::Small, Quality::Large]
    );
    assert_eq!(Quality::default(), Quality::Large);
}
