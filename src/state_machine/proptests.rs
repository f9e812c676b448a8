//! Property-based tests for the state machine
//!
//! Drives arbitrary event sequences through `transition`, applying the
//! effects to a real `Conversation`, and checks the turn-taking invariants.

use super::*;
use crate::conversation::{Conversation, Speaker, Turn};
use crate::data_url::ImageUpload;
use proptest::prelude::*;

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_upload() -> impl Strategy<Value = ImageUpload> {
    proptest::collection::vec(any::<u8>(), 1..16).prop_map(|bytes| ImageUpload {
        bytes,
        content_type: Some("image/png".to_string()),
        file_name: None,
    })
}

fn arb_event() -> impl Strategy<Value = Event> {
    prop_oneof![
        (
            prop_oneof![Just(String::new()), Just("  ".to_string()), "[a-z0-9+ ]{1,12}"],
            proptest::option::of(arb_upload()),
        )
            .prop_map(|(text, image)| Event::UserSubmit { text, image }),
        "[A-Za-z0-9]{4,12}".prop_map(|p| Event::ImageRead {
            data_url: format!("data:image/png;base64,{p}")
        }),
        Just(Event::ImageReadFailed),
        "[a-zA-Z ]{0,20}".prop_map(|text| Event::ReplyReady { text }),
        Just(Event::ReplyFailed),
    ]
}

// ============================================================================
// Harness
// ============================================================================

#[derive(Default)]
struct Tally {
    requests: usize,
    image_reads: usize,
}

fn apply(conv: &mut Conversation, effects: Vec<Effect>, tally: &mut Tally) {
    for effect in effects {
        match effect {
            Effect::AppendTurn {
                speaker,
                text,
                image,
            } => conv.append_turn(Turn::new(speaker, text, image)),
            Effect::SetBusy(busy) => conv.set_busy(busy),
            Effect::ReadImage { .. } => tally.image_reads += 1,
            Effect::RequestReply { .. } => tally.requests += 1,
        }
    }
}

fn count(conv: &Conversation, speaker: Speaker) -> usize {
    conv.turns().iter().filter(|t| t.speaker == speaker).count()
}

proptest! {
    #[test]
    fn busy_flag_tracks_state(events in proptest::collection::vec(arb_event(), 0..40)) {
        let mut state = ConvState::Idle;
        let mut conv = Conversation::new();
        let mut tally = Tally::default();

        for event in events {
            if let Ok(result) = transition(&state, event) {
                state = result.new_state;
                apply(&mut conv, result.effects, &mut tally);
            }
            prop_assert_eq!(conv.is_busy(), state.is_busy());
        }
    }

    #[test]
    fn rejected_events_change_nothing(events in proptest::collection::vec(arb_event(), 0..40)) {
        let mut state = ConvState::Idle;
        let mut conv = Conversation::new();
        let mut tally = Tally::default();

        for event in events {
            let before_state = state.clone();
            let before_turns = conv.turns().len();
            match transition(&state, event) {
                Ok(result) => {
                    state = result.new_state;
                    apply(&mut conv, result.effects, &mut tally);
                }
                Err(_) => {
                    prop_assert_eq!(&state, &before_state);
                    prop_assert_eq!(conv.turns().len(), before_turns);
                }
            }
        }
    }

    #[test]
    fn every_user_turn_gets_exactly_one_reply(events in proptest::collection::vec(arb_event(), 0..40)) {
        let mut state = ConvState::Idle;
        let mut conv = Conversation::new();
        let mut tally = Tally::default();

        for event in events {
            if let Ok(result) = transition(&state, event) {
                state = result.new_state;
                apply(&mut conv, result.effects, &mut tally);
            }

            // Greeting is the one model turn with no user turn before it.
            let users = count(&conv, Speaker::User);
            let models = count(&conv, Speaker::Model) - 1;
            match state {
                ConvState::AwaitingResponse => prop_assert_eq!(users, models + 1),
                ConvState::Idle | ConvState::ReadingImage { .. } => prop_assert_eq!(users, models),
            }
            // One model request per committed user turn, never more.
            prop_assert_eq!(tally.requests, users);
            prop_assert!(tally.image_reads >= conv.turns().iter().filter(|t| t.image.is_some()).count());
        }
    }

    #[test]
    fn turns_alternate_after_greeting(events in proptest::collection::vec(arb_event(), 0..40)) {
        let mut state = ConvState::Idle;
        let mut conv = Conversation::new();
        let mut tally = Tally::default();

        for event in events {
            if let Ok(result) = transition(&state, event) {
                state = result.new_state;
                apply(&mut conv, result.effects, &mut tally);
            }
        }

        for (i, turn) in conv.turns().iter().enumerate().skip(1) {
            let expected = if i % 2 == 1 { Speaker::User } else { Speaker::Model };
            prop_assert_eq!(turn.speaker, expected);
        }
    }
}
