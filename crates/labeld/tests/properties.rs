//! Property tests over generated labels: encoding stability, signature
//! round-trips, and wildcard-match consistency.

use proptest::prelude::*;

use labeld_core::{Frame, SigningKey};
use labeld_store::{pattern_matches, pattern_to_like};
use labeld_testkit::generators;

proptest! {
    #[test]
    fn signable_encoding_is_deterministic(label in generators::signed_label("did:plc:aaa")) {
        prop_assert_eq!(label.signable_bytes().unwrap(), label.signable_bytes().unwrap());
    }

    #[test]
    fn signed_labels_verify_and_reject_tampering(
        draft in generators::label_draft(),
        seed in any::<[u8; 32]>(),
    ) {
        prop_assume!(SigningKey::from_bytes(&seed).is_ok());
        let key = SigningKey::from_bytes(&seed).unwrap();

        let mut label = draft.into_label("did:plc:aaa");
        label.sign(&key).unwrap();
        prop_assert!(label.verify(&key.public_key()).is_ok());

        let mut tampered = label.clone();
        tampered.neg = !tampered.neg;
        prop_assert!(tampered.verify(&key.public_key()).is_err());
    }

    #[test]
    fn signing_never_changes_the_signable_bytes(label in generators::signed_label("did:plc:aaa")) {
        // The signable form covers everything except the signature, so a
        // signed label re-encodes to the bytes that were signed.
        let mut unsigned = label.clone();
        unsigned.sig = None;
        prop_assert_eq!(unsigned.signable_bytes().unwrap(), label.signable_bytes().unwrap());
    }

    #[test]
    fn frames_roundtrip_for_any_label(label in generators::signed_label("did:plc:aaa")) {
        // Decoding normalizes map ordering, so compare the canonical
        // encodings rather than the in-memory values.
        let frame = Frame::labels(1, std::slice::from_ref(&label));
        let wire = frame.encode().unwrap();
        let decoded = Frame::decode(&wire).unwrap();
        prop_assert_eq!(decoded.encode().unwrap(), wire);
    }

    #[test]
    fn prefix_matching_agrees_with_its_like_translation(
        prefix in "[a-z:/%_]{0,12}",
        uri in "[a-z:/%_]{0,16}",
    ) {
        // pattern_matches is the in-memory mirror of the SQL LIKE form;
        // a prefix pattern matches exactly when the URI starts with it.
        let pattern = format!("{prefix}*");
        prop_assert_eq!(pattern_matches(&pattern, &uri), uri.starts_with(&prefix));

        // And the LIKE translation always ends in an unescaped '%'.
        let like = pattern_to_like(&pattern);
        prop_assert!(like.ends_with('%'));
        prop_assert!(!like.ends_with("\\%"));
    }
}
