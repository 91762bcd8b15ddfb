/// Wire contract tests
///
/// Covers the JSON shapes browser clients depend on:
/// - realtime frames (`{"event": .., "data": ..}`)
/// - inbox rows
/// - enum spellings
use chrono::Utc;
use serde_json::json;
use social_hub_service::models::*;
use social_hub_service::websocket::{ClientMessage, ServerEvent};
use uuid::Uuid;

fn notification(kind: NotificationKind) -> Notification {
    NewNotification::new(Uuid::new_v4(), Uuid::new_v4(), kind, "hello")
        .into_notification(Uuid::new_v4(), Utc::now())
}

#[test]
fn test_notification_kind_spellings() {
    let expected = [
        (NotificationKind::Like, "like"),
        (NotificationKind::FriendRequest, "friend_request"),
        (NotificationKind::FriendRequestSent, "friend_request_sent"),
        (NotificationKind::GroupInvite, "group_invite"),
    ];

    for (kind, wire) in expected {
        assert_eq!(serde_json::to_value(kind).unwrap(), json!(wire));
        assert_eq!(NotificationKind::parse(wire), Some(kind));
    }
}

#[test]
fn test_friend_request_frame_carries_sender() {
    let n = notification(NotificationKind::FriendRequest);
    let frame = serde_json::to_value(ServerEvent::for_notification(&n)).unwrap();

    assert_eq!(frame["event"], "new_friend_request");
    assert_eq!(frame["data"]["from_user_id"], n.actor_id.to_string());
    assert_eq!(frame["data"]["notification_id"], n.id.to_string());
}

#[test]
fn test_post_notification_frame_omits_missing_group() {
    let post_id = Uuid::new_v4();
    let n = NewNotification::new(Uuid::new_v4(), Uuid::new_v4(), NotificationKind::Share, "shared")
        .about(NotificationSubject::Post(post_id))
        .into_notification(Uuid::new_v4(), Utc::now());

    let frame = serde_json::to_value(ServerEvent::for_notification(&n)).unwrap();
    assert_eq!(frame["event"], "new_notification");
    assert_eq!(frame["data"]["post_id"], post_id.to_string());
    assert!(frame["data"].get("group_id").is_none());
}

#[test]
fn test_inbox_row_is_flat() {
    let view = NotificationView {
        notification: notification(NotificationKind::Comment),
        actor_username: "bob".to_string(),
    };
    let row = serde_json::to_value(&view).unwrap();

    assert_eq!(row["kind"], "comment");
    assert_eq!(row["actor_username"], "bob");
    assert!(row.get("notification").is_none());
}

#[test]
fn test_client_join_frame() {
    let user_id = Uuid::new_v4();
    let raw = json!({ "event": "join_user_room", "data": { "user_id": user_id } }).to_string();
    assert_eq!(
        ClientMessage::from_json(&raw).unwrap(),
        ClientMessage::JoinUserRoom { user_id }
    );
    assert!(ClientMessage::from_json(r#"{"event":"shout","data":{}}"#).is_err());
}

#[test]
fn test_post_privacy_defaults_public() {
    assert_eq!(PostPrivacy::default(), PostPrivacy::Public);
    assert_eq!(PostPrivacy::parse(" Friends "), Some(PostPrivacy::Friends));
    assert_eq!(PostPrivacy::parse("secret"), None);
}
