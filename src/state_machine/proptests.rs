//! Property-based tests for the state machine
//!
//! These tests verify key invariants hold across all possible inputs.

use super::keyboard::{render_command, MediaAction, OutgoingMedia};
use super::state::*;
use super::transition::*;
use super::*;
use proptest::prelude::*;

// ============================================================================
// Test Helpers
// ============================================================================

fn test_context() -> EditorContext {
    EditorContext::new(UserId(1), ChatId(100), KeyboardLayout::default())
}

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_file_type() -> impl Strategy<Value = FileType> {
    prop_oneof![
        Just(FileType::Photo),
        Just(FileType::Video),
        Just(FileType::Document),
        Just(FileType::Audio),
    ]
}

fn arb_media() -> impl Strategy<Value = MediaDescriptor> {
    (arb_file_type(), "[a-zA-Z0-9_-]{4,16}", "[a-z ]{0,40}").prop_map(
        |(file_type, file_id, caption)| MediaDescriptor {
            file_type,
            file_id,
            caption,
        },
    )
}

fn arb_edit_state() -> impl Strategy<Value = EditState> {
    prop_oneof![
        Just(EditState::AwaitingMainChoice),
        Just(EditState::AwaitingWatermarkText),
        proptest::option::of("[a-z]{1,8}").prop_map(|selected_text| {
            EditState::AwaitingStyleSelection { selected_text }
        }),
    ]
}

fn arb_link() -> impl Strategy<Value = LinkButton> {
    ("[A-Za-z]{1,10}", "[a-z]{1,10}").prop_map(|(label, host)| {
        LinkButton::new(label, format!("https://{host}.example"))
    })
}

fn arb_session() -> impl Strategy<Value = Session> {
    (
        arb_media(),
        arb_edit_state(),
        proptest::collection::vec(arb_link(), 0..4),
        proptest::option::of(1i64..10_000),
    )
        .prop_map(|(media, state, buttons, message_id)| {
            let mut session = Session::new(UserId(1), ChatId(100), media).with_state(state);
            session.buttons = buttons;
            session.message_id = message_id.map(MessageId);
            session
        })
}

fn arb_action() -> impl Strategy<Value = Action> {
    prop_oneof![
        Just(Action::EditCaptionMenu),
        Just(Action::StyleMenu),
        Just(Action::AddButton),
        Just(Action::AddWatermark),
        Just(Action::TemplatesMenu),
        Just(Action::Done),
        "[a-z_]{1,12}".prop_map(|data| Action::parse(&data)),
    ]
}

fn arb_text() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-z ]{1,20}",
        "<b>[a-z]{0,8}(</b>)?",
        "<i>[a-z]{0,8}(</i>)?",
    ]
}

fn arb_event() -> impl Strategy<Value = Event> {
    prop_oneof![
        Just(Event::Start),
        arb_media().prop_map(Event::MediaReceived),
        Just(Event::UnsupportedMedia),
        arb_action().prop_map(Event::ButtonPressed),
        arb_text().prop_map(Event::TextReceived),
        proptest::collection::vec(any::<u8>(), 0..8)
            .prop_map(|image| Event::WatermarkRendered { image }),
        "[a-z ]{1,20}".prop_map(|message| Event::WatermarkFailed { message }),
        (1i64..10_000, proptest::option::of("[a-z0-9]{4,8}")).prop_map(|(id, file_id)| {
            Event::Delivered {
                message_id: MessageId(id),
                file_id,
            }
        }),
        "[a-z ]{1,20}".prop_map(|message| Event::DeliveryFailed { message }),
    ]
}

fn arb_unmarked_text() -> impl Strategy<Value = String> {
    "[a-zA-Z ]{0,30}"
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    // A second upload never touches the open session
    #[test]
    fn prop_upload_while_open_is_rejected(session in arb_session(), media in arb_media()) {
        let result = transition(Some(&session), &test_context(), Event::MediaReceived(media));
        prop_assert_eq!(result.unwrap_err(), TransitionError::SessionConflict);
    }

    // Replies without a style marker never change the caption
    #[test]
    fn prop_unmarked_style_reply_keeps_caption(
        session in arb_session(),
        selected in proptest::option::of("[a-z]{1,8}"),
        text in arb_unmarked_text()
    ) {
        let session = session.with_state(EditState::AwaitingStyleSelection { selected_text: selected });
        let result = transition(Some(&session), &test_context(), Event::TextReceived(text)).unwrap();
        let next = result.session.unwrap();
        prop_assert_eq!(next.caption, session.caption);
    }

    // The render builder is deterministic
    #[test]
    fn prop_render_command_is_pure(session in arb_session()) {
        let layout = KeyboardLayout::default();
        prop_assert_eq!(render_command(&session, layout), render_command(&session, layout));
    }

    // Existing media is sent only while no message exists; edits only once one does
    #[test]
    fn prop_render_action_follows_message_id(session in arb_session(), event in arb_event()) {
        if let Ok(result) = transition(Some(&session), &test_context(), event) {
            for effect in &result.effects {
                if let Effect::Render(cmd) = effect {
                    match &cmd.action {
                        MediaAction::Send { media: OutgoingMedia::Existing { .. }, .. } => {
                            prop_assert!(session.message_id.is_none());
                        }
                        MediaAction::EditCaption { message_id, .. } => {
                            prop_assert_eq!(Some(*message_id), session.message_id);
                        }
                        MediaAction::Send { media: OutgoingMedia::Upload { .. }, .. } => {}
                    }
                }
            }
        }
    }

    // Any change to the session is saved or deleted
    #[test]
    fn prop_changes_are_persisted(session in proptest::option::of(arb_session()), event in arb_event()) {
        if let Ok(result) = transition(session.as_ref(), &test_context(), event) {
            if result.session != session {
                let expected = if result.session.is_some() {
                    Effect::PersistSession
                } else {
                    Effect::DeleteSession
                };
                prop_assert!(
                    result.effects.contains(&expected),
                    "{:?} -> {:?} without {:?}: {:?}",
                    session,
                    result.session,
                    expected,
                    result.effects
                );
            }
        }
    }

    // message_id is present exactly when a send has reported back for this session
    #[test]
    fn prop_message_id_tracks_delivery(events in proptest::collection::vec(arb_event(), 0..30)) {
        let ctx = test_context();
        let mut session: Option<Session> = None;
        let mut delivered = false;

        for event in events {
            let is_delivery = matches!(event, Event::Delivered { .. });
            let had_session = session.is_some();
            if let Ok(result) = transition(session.as_ref(), &ctx, event) {
                session = result.session;
                match &session {
                    None => delivered = false,
                    Some(_) if !had_session => delivered = false,
                    Some(_) if is_delivery => delivered = true,
                    Some(_) => {}
                }
            }
            if let Some(current) = &session {
                prop_assert_eq!(current.message_id.is_some(), delivered);
            }
        }
    }

    // Done always closes the session from the main menu
    #[test]
    fn prop_done_closes_session(session in arb_session()) {
        let session = session.with_state(EditState::AwaitingMainChoice);
        let result = transition(
            Some(&session),
            &test_context(),
            Event::ButtonPressed(Action::Done),
        )
        .unwrap();
        prop_assert!(result.session.is_none());
        prop_assert!(result.effects.contains(&Effect::DeleteSession));
    }
}
