//! Chat use-case tests over in-memory stores and a recording
//! publisher: invitation lifecycle, room membership rules, message
//! fan-out, read-set semantics and unread aggregation.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use vidra_broker::{BrokerResult, ChatPublisher};
use vidra_chat::actions::Action;
use vidra_chat::dispatch::{dispatch, SessionCommand};
use vidra_chat::messages::{EnterRoomMessages, MessageService};
use vidra_chat::rooms::RoomService;
use vidra_chat::ChatServices;
use vidra_commons::constants::member_topic;
use vidra_commons::{
    today_bucket_date, ChatMessage, CommonError, Invitation, InvitationId, InvitationStatus,
    JoinMode, MemberId, MessageBucket, MessageId, Room, RoomId, RoomType, RoomUnreadInfo,
};
use vidra_store::{
    InvitationRepo, MarkReadOutcome, MessageRepo, RoomRepo, StoreError, StoreResult,
};

// ---- in-memory stores ----

#[derive(Default)]
struct MemRoomRepo {
    rooms: Mutex<HashMap<String, Room>>,
}

#[async_trait]
impl RoomRepo for MemRoomRepo {
    async fn create(&self, room: &Room) -> StoreResult<()> {
        let mut rooms = self.rooms.lock().unwrap();
        if rooms.contains_key(room.room_id.as_str()) {
            return Err(StoreError::Conflict("room already exists".into()));
        }
        rooms.insert(room.room_id.as_str().to_string(), room.clone());
        Ok(())
    }

    async fn find_by_id(&self, room_id: &RoomId) -> StoreResult<Option<Room>> {
        Ok(self.rooms.lock().unwrap().get(room_id.as_str()).cloned())
    }

    async fn add_member(&self, room_id: &RoomId, member: &MemberId) -> StoreResult<()> {
        let mut rooms = self.rooms.lock().unwrap();
        if let Some(room) = rooms.get_mut(room_id.as_str()) {
            if !room.members.contains(member) {
                room.members.push(member.clone());
            }
        }
        Ok(())
    }

    async fn remove_member(&self, room_id: &RoomId, member: &MemberId) -> StoreResult<()> {
        let mut rooms = self.rooms.lock().unwrap();
        let room = rooms
            .get_mut(room_id.as_str())
            .ok_or_else(|| StoreError::NotFound(room_id.to_string()))?;
        room.members.retain(|m| m != member);
        Ok(())
    }

    async fn find_private_room(&self, a: &MemberId, b: &MemberId) -> StoreResult<Option<Room>> {
        Ok(self
            .rooms
            .lock()
            .unwrap()
            .values()
            .find(|r| {
                r.room_type == RoomType::Private
                    && r.members.contains(a)
                    && r.members.contains(b)
            })
            .cloned())
    }
}

#[derive(Default)]
struct MemInvitationRepo {
    invitations: Mutex<Vec<Invitation>>,
}

#[async_trait]
impl InvitationRepo for MemInvitationRepo {
    async fn create(&self, invitation: &Invitation) -> StoreResult<()> {
        let mut invitations = self.invitations.lock().unwrap();
        let pending_exists = invitations.iter().any(|i| {
            i.inviter_id == invitation.inviter_id
                && i.invitee_id == invitation.invitee_id
                && i.status == InvitationStatus::Pending
        });
        if pending_exists {
            return Err(StoreError::Conflict("invitation already pending".into()));
        }
        invitations.push(invitation.clone());
        Ok(())
    }

    async fn find_latest_by_pair(
        &self,
        inviter: &MemberId,
        invitee: &MemberId,
    ) -> StoreResult<Option<Invitation>> {
        Ok(self
            .invitations
            .lock()
            .unwrap()
            .iter()
            .filter(|i| &i.inviter_id == inviter && &i.invitee_id == invitee)
            .last()
            .cloned())
    }

    async fn find_pending_by_pair(
        &self,
        inviter: &MemberId,
        invitee: &MemberId,
    ) -> StoreResult<Option<Invitation>> {
        Ok(self
            .invitations
            .lock()
            .unwrap()
            .iter()
            .find(|i| {
                &i.inviter_id == inviter
                    && &i.invitee_id == invitee
                    && i.status == InvitationStatus::Pending
            })
            .cloned())
    }

    async fn find_pending_for_invitee(&self, invitee: &MemberId) -> StoreResult<Vec<Invitation>> {
        Ok(self
            .invitations
            .lock()
            .unwrap()
            .iter()
            .filter(|i| &i.invitee_id == invitee && i.status == InvitationStatus::Pending)
            .cloned()
            .collect())
    }

    async fn update_status(
        &self,
        invitation_id: &InvitationId,
        status: InvitationStatus,
    ) -> StoreResult<()> {
        let mut invitations = self.invitations.lock().unwrap();
        let invitation = invitations
            .iter_mut()
            .find(|i| &i.invitation_id == invitation_id)
            .ok_or_else(|| StoreError::NotFound(invitation_id.to_string()))?;
        invitation.status = status;
        Ok(())
    }
}

#[derive(Default)]
struct MemMessageRepo {
    buckets: Mutex<HashMap<(String, String), Vec<ChatMessage>>>,
}

#[async_trait]
impl MessageRepo for MemMessageRepo {
    async fn append_message(
        &self,
        room_id: &RoomId,
        date: &str,
        message: &ChatMessage,
    ) -> StoreResult<()> {
        self.buckets
            .lock()
            .unwrap()
            .entry((room_id.as_str().to_string(), date.to_string()))
            .or_default()
            .push(message.clone());
        Ok(())
    }

    async fn find_bucket(
        &self,
        room_id: &RoomId,
        date: &str,
    ) -> StoreResult<Option<MessageBucket>> {
        Ok(self
            .buckets
            .lock()
            .unwrap()
            .get(&(room_id.as_str().to_string(), date.to_string()))
            .map(|messages| MessageBucket {
                room_id: room_id.clone(),
                date: date.to_string(),
                messages: messages.clone(),
            }))
    }

    async fn mark_read(
        &self,
        room_id: &RoomId,
        date: &str,
        message_id: &MessageId,
        member: &MemberId,
    ) -> StoreResult<MarkReadOutcome> {
        let mut buckets = self.buckets.lock().unwrap();
        let Some(messages) = buckets.get_mut(&(room_id.as_str().to_string(), date.to_string()))
        else {
            return Ok(MarkReadOutcome::NotFound);
        };
        let Some(message) = messages.iter_mut().find(|m| &m.message_id == message_id) else {
            return Ok(MarkReadOutcome::NotFound);
        };
        if message.read_by.contains(member) {
            return Ok(MarkReadOutcome::AlreadyRead);
        }
        message.read_by.push(member.clone());
        Ok(MarkReadOutcome::Updated)
    }

    async fn find_earliest_unread(
        &self,
        member: &MemberId,
        room_id: &RoomId,
    ) -> StoreResult<Option<MessageBucket>> {
        let buckets = self.buckets.lock().unwrap();
        let mut dates: Vec<&(String, String)> = buckets
            .keys()
            .filter(|(room, _)| room == room_id.as_str())
            .collect();
        dates.sort_by(|a, b| a.1.cmp(&b.1));

        for key in dates {
            let messages = &buckets[key];
            if messages.iter().any(|m| !m.read_by.contains(member)) {
                return Ok(Some(MessageBucket {
                    room_id: room_id.clone(),
                    date: key.1.clone(),
                    messages: messages.clone(),
                }));
            }
        }
        Ok(None)
    }

    async fn find_messages_before(
        &self,
        room_id: &RoomId,
        before_ts: i64,
    ) -> StoreResult<Vec<ChatMessage>> {
        let day = vidra_commons::bucket_date(
            chrono::DateTime::from_timestamp(before_ts, 0).expect("valid timestamp"),
        );
        Ok(self
            .buckets
            .lock()
            .unwrap()
            .get(&(room_id.as_str().to_string(), day))
            .map(|messages| {
                messages
                    .iter()
                    .filter(|m| m.timestamp < before_ts)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn count_unread_by_room(&self, member: &MemberId) -> StoreResult<Vec<RoomUnreadInfo>> {
        let buckets = self.buckets.lock().unwrap();
        let mut per_room: HashMap<String, (i64, i64)> = HashMap::new();

        for ((room, _date), messages) in buckets.iter() {
            for message in messages.iter().filter(|m| !m.read_by.contains(member)) {
                let entry = per_room.entry(room.clone()).or_insert((0, i64::MIN));
                entry.0 += 1;
                entry.1 = entry.1.max(message.timestamp);
            }
        }

        let mut infos: Vec<RoomUnreadInfo> = per_room
            .into_iter()
            .map(|(room, (count, last))| RoomUnreadInfo {
                room_id: RoomId::try_new(room).unwrap(),
                unread_count: count,
                last_unread_timestamp: last,
            })
            .collect();
        infos.sort_by(|a, b| b.last_unread_timestamp.cmp(&a.last_unread_timestamp));
        Ok(infos)
    }
}

#[derive(Default, Clone)]
struct RecordingPublisher {
    published: Arc<Mutex<Vec<(String, ChatMessage)>>>,
}

#[async_trait]
impl ChatPublisher for RecordingPublisher {
    async fn publish(&self, topic: &str, message: &ChatMessage) -> BrokerResult<()> {
        self.published
            .lock()
            .unwrap()
            .push((topic.to_string(), message.clone()));
        Ok(())
    }
}

// ---- fixture ----

struct Fixture {
    services: ChatServices,
    messages: Arc<MemMessageRepo>,
    publisher: RecordingPublisher,
}

fn fixture() -> Fixture {
    let rooms = Arc::new(MemRoomRepo::default());
    let invitations = Arc::new(MemInvitationRepo::default());
    let messages = Arc::new(MemMessageRepo::default());
    let publisher = RecordingPublisher::default();

    let services = ChatServices::new(
        RoomService::new(rooms.clone(), invitations),
        MessageService::new(rooms, messages.clone(), Arc::new(publisher.clone())),
    );
    Fixture {
        services,
        messages,
        publisher,
    }
}

fn member() -> MemberId {
    MemberId::generate()
}

// ---- invitation lifecycle ----

#[tokio::test]
async fn invite_accept_creates_private_room_once() {
    let f = fixture();
    let (alice, bob) = (member(), member());

    let invitation_id = f.services.rooms.invite(&alice, &bob).await.unwrap();

    // a second invite while pending conflicts
    let err = f.services.rooms.invite(&alice, &bob).await.unwrap_err();
    assert!(matches!(err, CommonError::AlreadyExists(_)));
    drop(invitation_id);

    let room_id = f.services.rooms.accept(&alice, &bob).await.unwrap();

    // accepting again is refused: the invitation left pending
    let err = f.services.rooms.accept(&alice, &bob).await.unwrap_err();
    assert!(matches!(err, CommonError::InvalidInput(_)));

    // a fresh invite + accept resolves to the same private room
    f.services.rooms.invite(&alice, &bob).await.unwrap();
    let second = f.services.rooms.accept(&alice, &bob).await.unwrap();
    assert_eq!(room_id, second);
}

#[tokio::test]
async fn accept_requires_pending_invitation_and_right_invitee() {
    let f = fixture();
    let (alice, bob) = (member(), member());

    let err = f.services.rooms.accept(&alice, &bob).await.unwrap_err();
    assert!(matches!(err, CommonError::NotFound(_)));

    // the invitee relation is directional: bob cannot accept an
    // invitation he never received
    f.services.rooms.invite(&alice, &bob).await.unwrap();
    let err = f.services.rooms.accept(&bob, &alice).await.unwrap_err();
    assert!(matches!(err, CommonError::NotFound(_)));
}

#[tokio::test]
async fn pending_invitations_listed_for_invitee() {
    let f = fixture();
    let (alice, bob, carol) = (member(), member(), member());

    f.services.rooms.invite(&alice, &carol).await.unwrap();
    f.services.rooms.invite(&bob, &carol).await.unwrap();

    let pending = f.services.rooms.pending_invitations(&carol).await.unwrap();
    assert_eq!(pending.len(), 2);
    assert!(pending.iter().all(|i| i.invitee_id == carol));

    // accepted invitations drop off the pending list
    f.services.rooms.accept(&alice, &carol).await.unwrap();
    let pending = f.services.rooms.pending_invitations(&carol).await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].inviter_id, bob);
}

// ---- room membership ----

#[tokio::test]
async fn create_private_room_requires_exactly_two_members() {
    let f = fixture();
    let alice = member();

    let err = f
        .services
        .rooms
        .create_room(&alice, RoomType::Private, String::new(), vec![], None, None, false)
        .await
        .unwrap_err();
    assert!(matches!(err, CommonError::InvalidInput(_)));

    let room_id = f
        .services
        .rooms
        .create_room(
            &alice,
            RoomType::Private,
            String::new(),
            vec![member()],
            None,
            None,
            false,
        )
        .await
        .unwrap();
    let room = f.services.rooms.exit_room(&alice, &room_id).await;
    assert!(room.is_ok());
}

#[tokio::test]
async fn group_creator_becomes_admin_and_join_modes_apply() {
    let f = fixture();
    let (alice, bob) = (member(), member());

    let open = f
        .services
        .rooms
        .create_room(&alice, RoomType::Group, "open".into(), vec![], Some(JoinMode::Open), None, false)
        .await
        .unwrap();

    // open join is idempotent
    f.services.rooms.join_room(&bob, &open, None).await.unwrap();
    f.services.rooms.join_room(&bob, &open, None).await.unwrap();

    let locked = f
        .services
        .rooms
        .create_room(
            &alice,
            RoomType::Group,
            "locked".into(),
            vec![],
            Some(JoinMode::Password),
            Some("s3cret".into()),
            false,
        )
        .await
        .unwrap();

    assert!(matches!(
        f.services.rooms.join_room(&bob, &locked, None).await.unwrap_err(),
        CommonError::PermissionDenied(_)
    ));
    assert!(matches!(
        f.services.rooms.join_room(&bob, &locked, Some("wrong")).await.unwrap_err(),
        CommonError::PermissionDenied(_)
    ));
    f.services
        .rooms
        .join_room(&bob, &locked, Some("s3cret"))
        .await
        .unwrap();

    let approval = f
        .services
        .rooms
        .create_room(
            &alice,
            RoomType::Group,
            "gated".into(),
            vec![],
            Some(JoinMode::Approve),
            None,
            false,
        )
        .await
        .unwrap();
    assert!(matches!(
        f.services.rooms.join_room(&bob, &approval, None).await.unwrap_err(),
        CommonError::PermissionDenied(_)
    ));
}

#[tokio::test]
async fn join_room_rejects_private_rooms_and_missing_rooms() {
    let f = fixture();
    let (alice, bob) = (member(), member());

    f.services.rooms.invite(&alice, &bob).await.unwrap();
    let private = f.services.rooms.accept(&alice, &bob).await.unwrap();

    assert!(matches!(
        f.services.rooms.join_room(&member(), &private, None).await.unwrap_err(),
        CommonError::InvalidInput(_)
    ));
    assert!(matches!(
        f.services
            .rooms
            .join_room(&member(), &RoomId::generate(), None)
            .await
            .unwrap_err(),
        CommonError::NotFound(_)
    ));
}

// ---- messages ----

#[tokio::test]
async fn send_message_fans_out_to_recipients_only() {
    let f = fixture();
    let (alice, bob, carol) = (member(), member(), member());

    let room_id = f
        .services
        .rooms
        .create_room(
            &alice,
            RoomType::Group,
            "general".into(),
            vec![bob.clone(), carol.clone()],
            Some(JoinMode::Open),
            None,
            false,
        )
        .await
        .unwrap();

    let message_id = f
        .services
        .messages
        .send_message(&alice, &room_id, "hi".into())
        .await
        .unwrap();

    let published = f.publisher.published.lock().unwrap();
    let topics: Vec<&str> = published.iter().map(|(t, _)| t.as_str()).collect();
    assert_eq!(published.len(), 2);
    assert!(topics.contains(&member_topic(bob.as_str()).as_str()));
    assert!(topics.contains(&member_topic(carol.as_str()).as_str()));
    // the sender never receives their own fan-out
    assert!(!topics.contains(&member_topic(alice.as_str()).as_str()));

    for (_, message) in published.iter() {
        assert_eq!(message.message_id, message_id);
        assert_eq!(message.sender_id, alice);
        assert_eq!(message.content, "hi");
        assert!(message.read_by.contains(&alice));
    }
}

#[tokio::test]
async fn send_message_to_missing_room_is_not_found() {
    let f = fixture();
    let err = f
        .services
        .messages
        .send_message(&member(), &RoomId::generate(), "hi".into())
        .await
        .unwrap_err();
    assert!(matches!(err, CommonError::NotFound(_)));
    assert!(f.publisher.published.lock().unwrap().is_empty());
}

#[tokio::test]
async fn read_by_stays_a_set_under_repeated_reads() {
    let f = fixture();
    let (alice, bob) = (member(), member());

    let room_id = f
        .services
        .rooms
        .create_room(
            &alice,
            RoomType::Group,
            "g".into(),
            vec![bob.clone()],
            Some(JoinMode::Open),
            None,
            false,
        )
        .await
        .unwrap();

    let message_id = f
        .services
        .messages
        .send_message(&alice, &room_id, "hi".into())
        .await
        .unwrap();

    for _ in 0..3 {
        f.services
            .messages
            .mark_read(&bob, &room_id, &message_id)
            .await
            .unwrap();
    }

    let bucket = f
        .messages
        .find_bucket(&room_id, &today_bucket_date())
        .await
        .unwrap()
        .unwrap();
    let message = &bucket.messages[0];
    assert_eq!(
        message.read_by.iter().filter(|m| *m == &bob).count(),
        1,
        "read_by must stay a set"
    );

    let err = f
        .services
        .messages
        .mark_read(&bob, &room_id, &MessageId::generate())
        .await
        .unwrap_err();
    assert!(matches!(err, CommonError::NotFound(_)));
}

#[tokio::test]
async fn unread_counts_follow_reads() {
    let f = fixture();
    let (alice, bob) = (member(), member());
    let room_id = RoomId::generate();
    let date = "2025-01-23";

    // controlled timestamps: three sends at 1000, 1001, 1002
    let mut ids = Vec::new();
    for ts in [1000, 1001, 1002] {
        let message = ChatMessage::new(alice.clone(), format!("m{ts}"), ts);
        ids.push(message.message_id.clone());
        f.messages.append_message(&room_id, date, &message).await.unwrap();
    }

    let counts = f.messages.count_unread_by_room(&bob).await.unwrap();
    assert_eq!(counts.len(), 1);
    assert_eq!(counts[0].room_id, room_id);
    assert_eq!(counts[0].unread_count, 3);
    assert_eq!(counts[0].last_unread_timestamp, 1002);

    // the sender has nothing unread
    assert!(f.messages.count_unread_by_room(&alice).await.unwrap().is_empty());

    f.messages.mark_read(&room_id, date, &ids[1], &bob).await.unwrap();
    let counts = f.messages.count_unread_by_room(&bob).await.unwrap();
    assert_eq!(counts[0].unread_count, 2);
}

#[tokio::test]
async fn enter_room_returns_earliest_unread_then_recent() {
    let f = fixture();
    let (alice, bob) = (member(), member());

    let room_id = f
        .services
        .rooms
        .create_room(
            &alice,
            RoomType::Group,
            "g".into(),
            vec![bob.clone()],
            Some(JoinMode::Open),
            None,
            false,
        )
        .await
        .unwrap();

    // an older bucket with an unread message, and one in today's
    let old = ChatMessage::new(alice.clone(), "yesterday".into(), 1000);
    f.messages.append_message(&room_id, "2020-01-01", &old).await.unwrap();
    let message_id = f
        .services
        .messages
        .send_message(&alice, &room_id, "today".into())
        .await
        .unwrap();

    // earliest unread bucket wins
    match f.services.messages.enter_room_messages(&bob, &room_id).await.unwrap() {
        EnterRoomMessages::Unread(bucket) => {
            assert_eq!(bucket.date, "2020-01-01");
            assert_eq!(bucket.messages.len(), 1);
        }
        other => panic!("expected unread bucket, got {other:?}"),
    }

    // once everything is read, the recent (current-day) path applies
    f.messages
        .mark_read(&room_id, "2020-01-01", &old.message_id, &bob)
        .await
        .unwrap();
    f.services
        .messages
        .mark_read(&bob, &room_id, &message_id)
        .await
        .unwrap();

    match f.services.messages.enter_room_messages(&bob, &room_id).await.unwrap() {
        EnterRoomMessages::Recent(_) => {}
        other => panic!("expected recent messages, got {other:?}"),
    }

    let err = f
        .services
        .messages
        .enter_room_messages(&bob, &RoomId::generate())
        .await
        .unwrap_err();
    assert!(matches!(err, CommonError::NotFound(_)));
}

// ---- protocol dispatch ----

#[tokio::test]
async fn dispatch_runs_the_one_on_one_bootstrap() {
    let f = fixture();
    let (alice, bob) = (member(), member());

    let (resp, cmd) = dispatch(
        &f.services,
        &alice,
        Action::InvitePrivate {
            invitee_id: bob.clone(),
        },
    )
    .await;
    assert!(resp.success);
    assert_eq!(resp.action, "invite_private");
    assert!(resp.payload.contains_key("invitation_id"));
    assert!(cmd.is_none());

    let (resp, _) = dispatch(
        &f.services,
        &bob,
        Action::AcceptInvite {
            inviter_id: alice.clone(),
        },
    )
    .await;
    assert!(resp.success);
    let room_id = resp.payload["room_id"].as_str().unwrap().to_string();

    let (resp, _) = dispatch(
        &f.services,
        &alice,
        Action::SendMessage {
            room_id: RoomId::try_new(room_id.clone()).unwrap(),
            content: "hi".into(),
        },
    )
    .await;
    assert!(resp.success);
    assert!(resp.payload.contains_key("message_id"));

    // bob got exactly one fan-out on his member topic
    let published = f.publisher.published.lock().unwrap();
    assert_eq!(published.len(), 1);
    assert_eq!(published[0].0, member_topic(bob.as_str()));
}

#[tokio::test]
async fn dispatch_duplicate_invite_reports_action_error() {
    let f = fixture();
    let (alice, bob) = (member(), member());

    f.services.rooms.invite(&alice, &bob).await.unwrap();
    let (resp, _) = dispatch(
        &f.services,
        &alice,
        Action::InvitePrivate {
            invitee_id: bob.clone(),
        },
    )
    .await;
    assert!(!resp.success);
    assert_eq!(resp.error.as_deref(), Some("already invited, wait for acceptance"));
}

#[tokio::test]
async fn dispatch_enter_and_leave_drive_room_subscription() {
    let f = fixture();
    let (alice, bob) = (member(), member());

    let room_id = f
        .services
        .rooms
        .create_room(
            &alice,
            RoomType::Group,
            "g".into(),
            vec![bob.clone()],
            Some(JoinMode::Open),
            None,
            false,
        )
        .await
        .unwrap();

    let (resp, cmd) = dispatch(
        &f.services,
        &bob,
        Action::EnterRoom {
            room_id: room_id.clone(),
        },
    )
    .await;
    assert!(resp.success);
    assert_eq!(cmd, Some(SessionCommand::EnterRoom(room_id.clone())));

    let (resp, cmd) = dispatch(
        &f.services,
        &bob,
        Action::LeaveRoom {
            room_id: room_id.clone(),
        },
    )
    .await;
    assert!(resp.success);
    assert_eq!(resp.payload["leave_room"], room_id.as_str());
    assert_eq!(cmd, Some(SessionCommand::LeaveRoom));
}

#[tokio::test]
async fn dispatch_get_unread_and_get_invite_payloads() {
    let f = fixture();
    let (alice, bob) = (member(), member());

    let room_id = f
        .services
        .rooms
        .create_room(
            &alice,
            RoomType::Group,
            "g".into(),
            vec![bob.clone()],
            Some(JoinMode::Open),
            None,
            false,
        )
        .await
        .unwrap();
    f.services
        .messages
        .send_message(&alice, &room_id, "one".into())
        .await
        .unwrap();
    f.services
        .messages
        .send_message(&alice, &room_id, "two".into())
        .await
        .unwrap();

    let (resp, _) = dispatch(&f.services, &bob, Action::GetUnread).await;
    assert!(resp.success);
    assert_eq!(resp.payload[room_id.as_str()], 2);

    let carol = member();
    f.services.rooms.invite(&carol, &bob).await.unwrap();
    let (resp, _) = dispatch(&f.services, &bob, Action::GetInvite).await;
    assert!(resp.success);
    assert!(resp.payload.contains_key(carol.as_str()));
}
