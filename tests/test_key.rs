use infoset_cli::action::ActionCode;
use infoset_cli::error::InfosetError;
use infoset_cli::key::*;

fn codes(raw: &[u8]) -> Vec<ActionCode> {
    raw.iter().map(|&c| ActionCode::new(c).unwrap()).collect()
}

#[test]
fn test_header_round_trip_all_fields() {
    for player in 0..=MAX_PLAYER {
        for street in Street::ALL {
            for card_id in 0..=MAX_CARD_ID {
                let key = encode_header(player, street, card_id).unwrap();
                let header = decode_header(key);
                assert_eq!(header, Header::new(player, street, card_id));
            }
        }
    }
}

#[test]
fn test_encode_header_rejects_wide_fields() {
    assert!(matches!(
        encode_header(2, Street::Flop, 0),
        Err(InfosetError::FieldOutOfRange { field: "player", .. })
    ));
    assert!(matches!(
        encode_header(0, Street::Flop, 8192),
        Err(InfosetError::FieldOutOfRange { field: "card_id", .. })
    ));
}

#[test]
fn test_known_key_value() {
    let key = InfosetKey::encode(Header::new(1, Street::Turn, 100), &codes(&[3, 2])).unwrap();
    assert_eq!(key.as_u64(), 1245989);
    assert_eq!(key.to_string(), "1245989");
    assert_eq!("1245989".parse::<InfosetKey>().unwrap(), key);
}

#[test]
fn test_preflop_aces_key() {
    assert_eq!(encode_header(0, Street::Preflop, 168).unwrap(), 1344);
}

#[test]
fn test_round_start_is_facing_bet() {
    for street in Street::ALL {
        let key = encode_header(0, street, 17).unwrap();
        assert!(is_facing_bet(key));
        assert!(InfosetKey::from_raw(key).is_round_start());
    }
}

#[test]
fn test_passive_last_action_not_facing() {
    let header = Header::new(0, Street::Flop, 42);
    assert!(!InfosetKey::encode(header, &codes(&[1])).unwrap().is_facing_bet());
    assert!(!InfosetKey::encode(header, &codes(&[2])).unwrap().is_facing_bet());
    assert!(!InfosetKey::encode(header, &codes(&[5, 2])).unwrap().is_facing_bet());
}

#[test]
fn test_aggressive_last_action_facing() {
    let header = Header::new(1, Street::River, 8191);
    for code in 3..=7 {
        let key = InfosetKey::encode(header, &codes(&[2, code])).unwrap();
        assert!(key.is_facing_bet(), "code {} should face a bet", code);
    }
}

#[test]
fn test_only_latest_action_counts() {
    let header = Header::new(0, Street::Turn, 3);
    let key = InfosetKey::encode(header, &codes(&[3, 4, 2])).unwrap();
    assert!(!key.is_facing_bet());
    let key = InfosetKey::encode(header, &codes(&[2, 2, 3])).unwrap();
    assert!(key.is_facing_bet());
}

#[test]
fn test_raw_keys_with_gaps() {
    // An empty group below the last action is skipped over.
    let key = (3u64 << HEADER_BITS) | (2 << (HEADER_BITS + 6));
    assert!(!is_facing_bet(key));
    let key = (2u64 << HEADER_BITS) | (5 << (HEADER_BITS + 6));
    assert!(is_facing_bet(key));
}

#[test]
fn test_history_iterates_in_order() {
    let key = InfosetKey::encode(Header::new(0, Street::Preflop, 0), &codes(&[3, 4, 2])).unwrap();
    let history: Vec<u8> = key.history().map(|c| c.as_u8()).collect();
    assert_eq!(history, vec![3, 4, 2]);
    assert_eq!(key.depth(), 3);
    assert_eq!(key.last_action(), Some(ActionCode::CHECK_CALL));
}

#[test]
fn test_round_start_history_is_empty() {
    let key = InfosetKey::from_raw(encode_header(1, Street::Flop, 9).unwrap());
    assert_eq!(key.history().count(), 0);
    assert_eq!(key.last_action(), None);
    assert_eq!(key.depth(), 0);
}

#[test]
fn test_push_action_matches_encode() {
    let header = Header::new(1, Street::Flop, 77);
    let built = InfosetKey::from_header(header)
        .unwrap()
        .push_action(ActionCode::new(4).unwrap())
        .unwrap()
        .push_action(ActionCode::FOLD)
        .unwrap();
    assert_eq!(built, InfosetKey::encode(header, &codes(&[4, 1])).unwrap());
}

#[test]
fn test_with_card_id_keeps_history() {
    let base = InfosetKey::encode(Header::new(1, Street::Preflop, 0), &codes(&[3])).unwrap();
    let key = base.with_card_id(168).unwrap();
    assert_eq!(key.card_id(), 168);
    assert_eq!(key.player(), 1);
    assert_eq!(key.history_bits(), base.history_bits());

    let again = key.with_card_id(5).unwrap();
    assert_eq!(again.card_id(), 5);
    assert!(key.with_card_id(9000).is_err());
}

#[test]
fn test_builder_tracks_depth() {
    let mut builder = KeyBuilder::new(Header::new(0, Street::Turn, 1)).unwrap();
    builder.push(ActionCode::CHECK_CALL).unwrap().push(ActionCode::new(3).unwrap()).unwrap();
    assert_eq!(builder.depth(), 2);
    assert!(builder.build().is_facing_bet());
}

#[test]
fn test_code_zero_cannot_be_encoded() {
    assert!(matches!(ActionCode::new(0), Err(InfosetError::InvalidActionCode(0))));
    assert!(ActionCode::new(8).is_err());
}

#[test]
fn test_street_parsing() {
    assert_eq!("flop".parse::<Street>().unwrap(), Street::Flop);
    assert_eq!("River".parse::<Street>().unwrap(), Street::River);
    assert_eq!("2".parse::<Street>().unwrap(), Street::Turn);
    assert!("4".parse::<Street>().is_err());
    assert!("showdown".parse::<Street>().is_err());
}

#[test]
fn test_bad_key_string() {
    assert!("abc".parse::<InfosetKey>().is_err());
    assert!("-1".parse::<InfosetKey>().is_err());
    assert_eq!(" 42 ".parse::<InfosetKey>().unwrap().as_u64(), 42);
}
