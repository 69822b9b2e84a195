use labstore_api::{ErrorBody, NodeId as WireId, NodeRecord};
use labstore_app::{
    BlockReason, DeleteError, DeletionSession, DeletionState, EditorError, EditorPhase,
    ImpactCheckPolicy, ImpactStatus, MutationCoordinator, SubmitGate,
};
use labstore_client::{BackendError, Endpoint, InMemoryBackend};
use labstore_core::{DeviceKind, Field, NodeRef, NodeType};
use labstore_events::{Event, EventBus};
use std::collections::BTreeMap;
use std::sync::Arc;

struct Lab {
    backend: Arc<InMemoryBackend>,
    room: NodeRef,
    annex: NodeRef,
    cold_room: NodeRef,
    device: NodeRef,
    shelf: NodeRef,
    rack: NodeRef,
}

fn lab() -> Lab {
    let backend = Arc::new(InMemoryBackend::new());
    let room = backend.add_room("Main Lab", "LAB1");
    let annex = backend.add_room("Annex", "ANX");
    let cold_room = backend.add_room("Cold Room", "CLD");
    let device = backend.add_device(room, "Freezer A", "FRZ01", DeviceKind::Freezer);
    let shelf = backend.add_shelf(device, "Top", "SH1");
    let rack = backend.add_rack(shelf, "Rack 1", "RK1");
    Lab {
        backend,
        room,
        annex,
        cold_room,
        device,
        shelf,
        rack,
    }
}

fn editor(lab: &Lab, policy: ImpactCheckPolicy) -> MutationCoordinator<InMemoryBackend> {
    MutationCoordinator::new(lab.backend.clone(), EventBus::new(), policy)
}

async fn wait_for_request(backend: &InMemoryBackend, endpoint: Endpoint, count: usize) {
    for _ in 0..1_000 {
        if backend.requests_to(endpoint).len() >= count {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("no request to {endpoint:?} arrived");
}

fn last_body(backend: &InMemoryBackend, endpoint: Endpoint) -> serde_json::Value {
    backend
        .requests_to(endpoint)
        .last()
        .and_then(|r| r.body.clone())
        .expect("request body")
}

#[tokio::test]
async fn test_room_description_edit_saves_without_warnings() {
    let lab = lab();
    let editor = editor(&lab, ImpactCheckPolicy::default());
    editor.open_existing(lab.room, None).await.expect("open");

    editor
        .set_field(Field::Description, "Ground floor, east wing")
        .expect("edit");
    let view = editor.view().expect("open editor");
    assert_eq!(view.gate, SubmitGate::ReadyToSave);
    assert_eq!(view.code_warning, None);
    assert_eq!(view.impact, ImpactStatus::NotNeeded);

    let outcome = editor.save().await.expect("save");
    assert!(outcome.reconciled());
    assert!(!editor.is_open());

    let body = last_body(&lab.backend, Endpoint::Update);
    assert_eq!(body["description"], "Ground floor, east wing");
    assert_eq!(body["name"], "Main Lab");
    assert_eq!(body["code"], "LAB1");
    assert!(body.get("parentRoomId").is_none());
}

#[tokio::test]
async fn test_device_code_change_requires_acknowledgment() {
    let lab = lab();
    let editor = editor(&lab, ImpactCheckPolicy::default());
    editor.open_existing(lab.device, None).await.expect("open");

    editor.set_field(Field::Code, "frz02").expect("edit");
    let view = editor.view().expect("open editor");
    assert_eq!(
        view.code_warning.as_deref(),
        Some("Changing the code will invalidate previously printed labels that reference FRZ01.")
    );
    assert_eq!(
        view.gate,
        SubmitGate::Blocked(vec![BlockReason::CodeChangeUnacknowledged])
    );
    assert!(matches!(
        editor.save().await,
        Err(EditorError::Blocked(_))
    ));
    assert!(lab.backend.requests_to(Endpoint::Update).is_empty());

    assert!(editor.acknowledge_code_change(true).expect("ack"));
    assert_eq!(editor.gate(), Some(SubmitGate::ReadyToSave));

    editor.save().await.expect("save");
    assert_eq!(last_body(&lab.backend, Endpoint::Update)["code"], "FRZ02");
    assert_eq!(
        lab.backend.record(lab.device).and_then(|r| r.code).as_deref(),
        Some("FRZ02")
    );
}

#[tokio::test]
async fn test_code_acknowledgment_does_not_survive_a_revert() {
    let lab = lab();
    let editor = editor(&lab, ImpactCheckPolicy::default());
    editor.open_existing(lab.device, None).await.expect("open");

    editor.set_field(Field::Code, "FRZ02").expect("edit");
    editor.acknowledge_code_change(true).expect("ack");
    editor.set_field(Field::Code, "FRZ01").expect("revert");
    assert_eq!(editor.gate(), Some(SubmitGate::ReadyToSave));

    editor.set_field(Field::Code, "FRZ02").expect("edit again");
    assert_eq!(
        editor.gate(),
        Some(SubmitGate::Blocked(vec![BlockReason::CodeChangeUnacknowledged]))
    );
}

#[tokio::test]
async fn test_reassigning_device_with_samples_requires_acknowledgment() {
    let lab = lab();
    lab.backend.assign_samples(lab.shelf, 3);
    lab.backend.assign_samples(lab.rack, 2);
    let editor = editor(&lab, ImpactCheckPolicy::default());
    editor.open_existing(lab.device, None).await.expect("open");

    editor
        .change_parent(&lab.annex.id.to_string())
        .await
        .expect("change parent");
    let view = editor.view().expect("open editor");
    match &view.impact {
        ImpactStatus::Warning {
            result,
            acknowledged,
        } => {
            assert_eq!(result.sample_count, 5);
            assert!(!acknowledged);
        }
        other => panic!("expected a warning, got {other:?}"),
    }
    assert_eq!(
        view.gate,
        SubmitGate::Blocked(vec![BlockReason::ParentImpactUnacknowledged])
    );

    assert!(editor.acknowledge_parent_impact(true).expect("ack"));
    assert_eq!(editor.gate(), Some(SubmitGate::ReadyToSave));

    editor
        .change_parent(&lab.cold_room.id.to_string())
        .await
        .expect("change parent again");
    assert!(matches!(
        editor.view().expect("open editor").impact,
        ImpactStatus::Warning {
            acknowledged: false,
            ..
        }
    ));

    editor.acknowledge_parent_impact(true).expect("ack");
    editor.save().await.expect("save");
    assert_eq!(
        last_body(&lab.backend, Endpoint::Update)["parentRoomId"],
        lab.cold_room.id.to_string()
    );
}

#[tokio::test]
async fn test_reverting_parent_clears_the_impact_gate() {
    let lab = lab();
    lab.backend.assign_samples(lab.rack, 1);
    let editor = editor(&lab, ImpactCheckPolicy::default());
    editor.open_existing(lab.device, None).await.expect("open");

    editor
        .change_parent(&lab.annex.id.to_string())
        .await
        .expect("change parent");
    assert!(!editor.gate().expect("gate").is_ready());

    editor
        .change_parent(&lab.room.id.to_string())
        .await
        .expect("revert");
    let view = editor.view().expect("open editor");
    assert_eq!(view.impact, ImpactStatus::NotNeeded);
    assert_eq!(view.gate, SubmitGate::ReadyToSave);
    assert_eq!(lab.backend.requests_to(Endpoint::CanMove).len(), 1);
}

#[tokio::test]
async fn test_room_with_devices_cannot_be_deleted() {
    let lab = lab();
    let events = EventBus::new();
    let mut session = DeletionSession::open(lab.backend.clone(), events.clone(), lab.room).await;

    match session.state() {
        DeletionState::Blocked { reason, summary } => {
            assert_eq!(
                reason,
                "Cannot delete Room 'Main Lab' because it contains 1 device(s)"
            );
            let summary = summary.as_ref().expect("cascade summary");
            assert_eq!(summary.child_locations.get("devices"), Some(&1));
        }
        other => panic!("expected blocked, got {other:?}"),
    }
    assert!(!session.set_confirmed(true));
    assert!(!session.can_confirm());
    assert!(matches!(
        session.confirm().await,
        Err(DeleteError::Blocked(_))
    ));

    session.cancel();
    assert_eq!(session.state(), &DeletionState::Cancelled);
    assert!(lab.backend.requests_to(Endpoint::Delete).is_empty());
    assert!(
        events
            .drain()
            .iter()
            .any(|e| matches!(e, Event::DeleteBlocked { .. }))
    );
}

#[tokio::test]
async fn test_rack_without_parent_is_broken_and_sends_nothing() {
    let lab = lab();
    let orphan = lab.backend.put_record(
        NodeType::Rack,
        NodeRecord {
            label: Some("Orphan".into()),
            parent_shelf_id: Some(WireId("null".into())),
            ..Default::default()
        },
    );
    let editor = editor(&lab, ImpactCheckPolicy::default());

    let err = editor
        .open_existing(orphan, None)
        .await
        .expect_err("broken record");
    let message = "Cannot edit rack: parent shelf information is missing. This may indicate a data integrity issue.";
    assert!(matches!(&err, EditorError::DataIntegrity(m) if m == message));
    let view = editor.view().expect("open editor");
    assert_eq!(view.phase, EditorPhase::Broken(message.to_string()));
    assert!(matches!(
        editor.set_field(Field::Label, "Renamed"),
        Err(EditorError::DataIntegrity(_))
    ));
    assert!(matches!(
        editor.save().await,
        Err(EditorError::DataIntegrity(_))
    ));
    assert!(lab.backend.requests_to(Endpoint::Update).is_empty());
}

#[tokio::test]
async fn test_rack_parent_recovered_from_placeholder() {
    let lab = lab();
    let orphan = lab.backend.put_record(
        NodeType::Rack,
        NodeRecord {
            label: Some("Rack 2".into()),
            ..Default::default()
        },
    );
    let placeholder = NodeRecord {
        label: Some("Rack 2".into()),
        parent_shelf_id: Some(lab.shelf.id.into()),
        ..Default::default()
    };
    let editor = editor(&lab, ImpactCheckPolicy::default());
    editor
        .open_existing(orphan, Some(placeholder))
        .await
        .expect("open");

    editor.save().await.expect("save");
    assert_eq!(
        last_body(&lab.backend, Endpoint::Update)["parentShelfId"],
        lab.shelf.id.to_string()
    );
}

#[tokio::test]
async fn test_creating_rack_without_parent_sends_nothing() {
    let lab = lab();
    let editor = editor(&lab, ImpactCheckPolicy::default());
    editor.open_new(NodeType::Rack, None).await.expect("open");
    editor.set_field(Field::Label, "Rack 9").expect("edit");

    let err = editor.save().await.expect_err("no parent");
    assert!(matches!(
        &err,
        EditorError::DataIntegrity(m) if m.starts_with("Cannot create rack")
    ));
    assert!(lab.backend.requests_to(Endpoint::Create).is_empty());
    assert!(editor.is_open());
}

#[tokio::test]
async fn test_device_temperature_validation() {
    let lab = lab();
    let editor = editor(&lab, ImpactCheckPolicy::default());
    editor.open_existing(lab.device, None).await.expect("open");

    editor
        .set_field(Field::TemperatureSetting, "abc")
        .expect("edit");
    let view = editor.view().expect("open editor");
    assert!(view.field_errors.contains(Field::TemperatureSetting));
    assert_eq!(
        view.gate,
        SubmitGate::Blocked(vec![BlockReason::InvalidFields])
    );
    assert!(matches!(
        editor.save().await,
        Err(EditorError::Blocked(_))
    ));

    for valid in ["", "-20", "0"] {
        editor
            .set_field(Field::TemperatureSetting, valid)
            .expect("edit");
        assert_eq!(editor.gate(), Some(SubmitGate::ReadyToSave), "{valid:?}");
    }
}

#[tokio::test]
async fn test_duplicate_code_keeps_editor_open() {
    let lab = lab();
    lab.backend
        .add_device(lab.annex, "Freezer B", "FRZ09", DeviceKind::Freezer);
    let editor = editor(&lab, ImpactCheckPolicy::default());
    editor.open_existing(lab.device, None).await.expect("open");
    editor.set_field(Field::Code, "FRZ09").expect("edit");
    editor.acknowledge_code_change(true).expect("ack");

    let err = editor.save().await.expect_err("conflict");
    assert!(err.is_conflict());
    assert_eq!(
        err.to_string(),
        "Code 'FRZ09' already exists for another device"
    );

    let view = editor.view().expect("still open");
    assert_eq!(view.phase, EditorPhase::Ready);
    assert_eq!(view.banner.as_deref(), Some(err.to_string().as_str()));
    assert_eq!(view.fields.expect("fields").code, "FRZ09");
}

#[tokio::test]
async fn test_server_field_errors_are_flattened_and_attached() {
    let lab = lab();
    let editor = editor(&lab, ImpactCheckPolicy::default());
    editor.open_existing(lab.shelf, None).await.expect("open");
    lab.backend.fail_next(
        Endpoint::Update,
        BackendError::Rejected {
            status: 400,
            body: ErrorBody {
                field_errors: Some(BTreeMap::from([(
                    "capacityLimit".to_string(),
                    "must not exceed 500".to_string(),
                )])),
                ..Default::default()
            },
        },
    );

    let err = editor.save().await.expect_err("rejected");
    assert_eq!(
        err.to_string(),
        "Validation errors: capacityLimit: must not exceed 500"
    );
    let view = editor.view().expect("still open");
    assert_eq!(
        view.field_errors.get(Field::CapacityLimit),
        Some("must not exceed 500")
    );

    editor.set_field(Field::CapacityLimit, "400").expect("edit");
    let view = editor.view().expect("still open");
    assert!(!view.field_errors.contains(Field::CapacityLimit));
    assert_eq!(view.banner, None);
}

#[tokio::test]
async fn test_bare_rejection_uses_status_fallback() {
    let lab = lab();
    let editor = editor(&lab, ImpactCheckPolicy::default());
    editor.open_existing(lab.room, None).await.expect("open");
    lab.backend.fail_next(
        Endpoint::Update,
        BackendError::Rejected {
            status: 500,
            body: ErrorBody::default(),
        },
    );
    let err = editor.save().await.expect_err("rejected");
    assert_eq!(err.to_string(), "Failed to update location (status: 500)");
}

#[tokio::test]
async fn test_failed_reconciling_read_still_closes_without_data() {
    let lab = lab();
    let events = EventBus::new();
    let editor = MutationCoordinator::new(lab.backend.clone(), events.clone(), ImpactCheckPolicy::default());
    editor.open_existing(lab.room, None).await.expect("open");
    editor.set_field(Field::Name, "Main Laboratory").expect("edit");
    lab.backend
        .fail_next(Endpoint::Get, BackendError::Network("connection reset".into()));

    let outcome = editor.save().await.expect("write succeeded");
    assert!(!outcome.reconciled());
    assert_eq!(outcome.record, None);
    assert_eq!(outcome.node, Some(lab.room));
    assert!(!editor.is_open());

    let saved = events
        .drain()
        .into_iter()
        .find_map(|e| match e {
            Event::NodeSaved { reconciled, .. } => Some(reconciled),
            _ => None,
        })
        .expect("saved event");
    assert!(!saved);
}

#[tokio::test]
async fn test_load_failure_is_recoverable() {
    let lab = lab();
    let editor = editor(&lab, ImpactCheckPolicy::default());
    lab.backend
        .fail_next(Endpoint::Get, BackendError::Network("timeout".into()));

    let err = editor
        .open_existing(lab.device, None)
        .await
        .expect_err("load failed");
    assert_eq!(err.to_string(), "Failed to load location data");
    assert_eq!(
        editor.view().expect("open editor").phase,
        EditorPhase::LoadFailed("Failed to load location data".into())
    );

    editor.reload().await.expect("reload");
    let view = editor.view().expect("open editor");
    assert_eq!(view.phase, EditorPhase::Ready);
    assert_eq!(view.title, "Freezer A");
}

#[tokio::test]
async fn test_parent_options_exclude_inactive_nodes() {
    let lab = lab();
    lab.backend.set_active(lab.annex, false);
    let editor = editor(&lab, ImpactCheckPolicy::default());
    editor.open_existing(lab.device, None).await.expect("open");

    let names: Vec<String> = editor
        .view()
        .expect("open editor")
        .parent_options
        .into_iter()
        .map(|o| o.name)
        .collect();
    assert_eq!(names, vec!["Main Lab", "Cold Room"]);
}

#[tokio::test]
async fn test_parent_option_failure_is_not_fatal() {
    let lab = lab();
    lab.backend
        .fail_next(Endpoint::List, BackendError::Network("offline".into()));
    let editor = editor(&lab, ImpactCheckPolicy::default());
    editor.open_existing(lab.shelf, None).await.expect("open");
    let view = editor.view().expect("open editor");
    assert_eq!(view.phase, EditorPhase::Ready);
    assert!(view.parent_options.is_empty());
}

#[tokio::test]
async fn test_create_device_under_room() {
    let lab = lab();
    let events = EventBus::new();
    let editor = MutationCoordinator::new(lab.backend.clone(), events.clone(), ImpactCheckPolicy::default());
    editor
        .open_new(NodeType::Device, Some(lab.annex.id))
        .await
        .expect("open");
    editor.set_field(Field::Name, "Cabinet 1").expect("edit");
    editor.set_field(Field::DeviceType, "cabinet").expect("edit");
    editor.set_field(Field::Code, "cab1").expect("edit");
    assert_eq!(editor.gate(), Some(SubmitGate::ReadyToSave));

    let outcome = editor.save().await.expect("create");
    assert!(outcome.created);
    let record = outcome.record.expect("reconciled");
    assert_eq!(record.code.as_deref(), Some("CAB1"));
    assert_eq!(
        record.parent_id(NodeType::Device),
        Some(WireId::from(lab.annex.id))
    );
    assert!(lab.backend.requests_to(Endpoint::CanMove).is_empty());
    assert!(events.drain().iter().any(|e| matches!(
        e,
        Event::NodeSaved {
            created: true,
            reconciled: true,
            ..
        }
    )));
}

#[tokio::test]
async fn test_impact_check_failure_fails_closed_by_default() {
    let lab = lab();
    let editor = editor(&lab, ImpactCheckPolicy::FailClosed);
    editor.open_existing(lab.device, None).await.expect("open");
    lab.backend
        .fail_next(Endpoint::CanMove, BackendError::Network("offline".into()));

    editor
        .change_parent(&lab.annex.id.to_string())
        .await
        .expect("change parent");
    let gate = editor.gate().expect("gate");
    assert!(matches!(
        gate,
        SubmitGate::Blocked(ref reasons)
            if matches!(reasons.as_slice(), [BlockReason::ImpactCheckFailed(_)])
    ));
    assert_eq!(
        BlockReason::ImpactCheckFailed(String::new()).to_string(),
        "Impact check failed"
    );

    editor.refresh_parent_impact().await.expect("retry");
    assert_eq!(editor.view().expect("open editor").impact, ImpactStatus::Clear);
    assert_eq!(editor.gate(), Some(SubmitGate::ReadyToSave));
}

#[tokio::test]
async fn test_impact_check_failure_can_fail_open() {
    let lab = lab();
    lab.backend.assign_samples(lab.rack, 4);
    let editor = editor(&lab, ImpactCheckPolicy::FailOpen);
    editor.open_existing(lab.device, None).await.expect("open");
    lab.backend
        .fail_next(Endpoint::CanMove, BackendError::Network("offline".into()));

    editor
        .change_parent(&lab.annex.id.to_string())
        .await
        .expect("change parent");
    assert_eq!(editor.gate(), Some(SubmitGate::ReadyToSave));
}

#[tokio::test]
async fn test_moving_rack_without_samples_is_clear() {
    let lab = lab();
    let editor = editor(&lab, ImpactCheckPolicy::default());
    editor.open_existing(lab.rack, None).await.expect("open");

    let other_shelf = lab.backend.add_shelf(lab.device, "Bottom", "SH2");
    editor
        .change_parent(&other_shelf.id.to_string())
        .await
        .expect("change parent");
    assert_eq!(editor.view().expect("open editor").impact, ImpactStatus::Clear);
    editor.save().await.expect("save");
}

#[tokio::test]
async fn test_superseded_impact_answer_is_discarded() {
    let lab = lab();
    lab.backend.assign_samples(lab.shelf, 7);
    let editor = editor(&lab, ImpactCheckPolicy::default());
    editor.open_existing(lab.device, None).await.expect("open");

    let hold = lab.backend.hold(Endpoint::CanMove);
    let pending = tokio::spawn({
        let editor = editor.clone();
        let annex = lab.annex.id.to_string();
        async move { editor.change_parent(&annex).await }
    });
    wait_for_request(&lab.backend, Endpoint::CanMove, 1).await;
    assert_eq!(
        editor.gate(),
        Some(SubmitGate::Blocked(vec![BlockReason::ParentImpactPending]))
    );

    editor
        .set_field(Field::Parent, lab.room.id.to_string())
        .expect("revert");
    hold.release();
    pending.await.expect("join").expect("stale check");

    let view = editor.view().expect("open editor");
    assert_eq!(view.impact, ImpactStatus::NotNeeded);
    assert_eq!(view.gate, SubmitGate::ReadyToSave);
}

#[tokio::test]
async fn test_load_answer_after_close_is_discarded() {
    let lab = lab();
    let editor = editor(&lab, ImpactCheckPolicy::default());
    let hold = lab.backend.hold(Endpoint::Get);

    let pending = tokio::spawn({
        let editor = editor.clone();
        let device = lab.device;
        async move { editor.open_existing(device, None).await }
    });
    wait_for_request(&lab.backend, Endpoint::Get, 1).await;
    editor.close();
    hold.release();

    let result = pending.await.expect("join");
    assert!(matches!(result, Err(EditorError::Superseded)));
    assert!(editor.view().is_none());
}

#[tokio::test]
async fn test_edits_are_refused_while_submitting() {
    let lab = lab();
    let editor = editor(&lab, ImpactCheckPolicy::default());
    editor.open_existing(lab.room, None).await.expect("open");
    editor.set_field(Field::Name, "Main Laboratory").expect("edit");

    let hold = lab.backend.hold(Endpoint::Update);
    let pending = tokio::spawn({
        let editor = editor.clone();
        async move { editor.save().await }
    });
    wait_for_request(&lab.backend, Endpoint::Update, 1).await;

    assert!(matches!(
        editor.set_field(Field::Name, "Too late"),
        Err(EditorError::Busy)
    ));
    assert_eq!(
        editor.view().expect("open editor").phase,
        EditorPhase::Submitting
    );

    hold.release();
    pending.await.expect("join").expect("save");
    assert_eq!(
        lab.backend.record(lab.room).and_then(|r| r.name).as_deref(),
        Some("Main Laboratory")
    );
}

#[tokio::test]
async fn test_parent_options_keep_nodes_without_active_flag() {
    let lab = lab();
    let basement = lab.backend.put_record(
        NodeType::Room,
        NodeRecord {
            name: Some("Basement".into()),
            active: None,
            ..Default::default()
        },
    );
    let editor = editor(&lab, ImpactCheckPolicy::default());
    editor.open_existing(lab.device, None).await.expect("open");

    let options = editor.view().expect("open editor").parent_options;
    assert!(
        options
            .iter()
            .any(|o| o.id == basement.id && o.name == "Basement")
    );
    assert_eq!(options.len(), 4);
}

#[tokio::test]
async fn test_reselecting_same_parent_keeps_acknowledgment() {
    let lab = lab();
    lab.backend.assign_samples(lab.shelf, 2);
    let editor = editor(&lab, ImpactCheckPolicy::default());
    editor.open_existing(lab.device, None).await.expect("open");

    let annex = lab.annex.id.to_string();
    editor.change_parent(&annex).await.expect("change parent");
    assert!(editor.acknowledge_parent_impact(true).expect("ack"));

    editor.change_parent(&annex).await.expect("same parent");
    editor.set_field(Field::Parent, annex.clone()).expect("same parent");
    let view = editor.view().expect("open editor");
    assert!(matches!(
        view.impact,
        ImpactStatus::Warning {
            acknowledged: true,
            ..
        }
    ));
    assert_eq!(view.gate, SubmitGate::ReadyToSave);
    assert_eq!(lab.backend.requests_to(Endpoint::CanMove).len(), 1);
}

#[tokio::test]
async fn test_unchanged_value_keeps_server_feedback() {
    let lab = lab();
    let editor = editor(&lab, ImpactCheckPolicy::default());
    editor.open_existing(lab.device, None).await.expect("open");
    editor.set_field(Field::Code, "FRZ09").expect("edit");
    editor.acknowledge_code_change(true).expect("ack");
    lab.backend.fail_next(
        Endpoint::Update,
        BackendError::Rejected {
            status: 400,
            body: ErrorBody {
                message: Some("Code already in use".into()),
                field_errors: Some(BTreeMap::from([(
                    "code".to_string(),
                    "Code already in use".to_string(),
                )])),
                ..Default::default()
            },
        },
    );
    editor.save().await.expect_err("rejected");

    editor.set_field(Field::Code, "frz09").expect("same code");
    let view = editor.view().expect("open editor");
    assert_eq!(view.banner.as_deref(), Some("Code already in use"));
    assert!(view.field_errors.contains(Field::Code));
}

#[tokio::test]
async fn test_clearing_rack_parent_blocks_save() {
    let lab = lab();
    let editor = editor(&lab, ImpactCheckPolicy::default());
    editor.open_existing(lab.rack, None).await.expect("open");

    editor.set_field(Field::Parent, "").expect("edit");
    assert_eq!(
        editor.gate(),
        Some(SubmitGate::Blocked(vec![BlockReason::ParentMissing]))
    );
    assert!(matches!(
        editor.save().await,
        Err(EditorError::DataIntegrity(m)) if m.starts_with("Cannot edit rack")
    ));
    assert!(lab.backend.requests_to(Endpoint::Update).is_empty());

    editor
        .set_field(Field::Parent, lab.shelf.id.to_string())
        .expect("restore");
    assert_eq!(editor.gate(), Some(SubmitGate::ReadyToSave));
}

#[tokio::test]
async fn test_close_during_save_announces_close_once() {
    let lab = lab();
    let events = EventBus::new();
    let editor = MutationCoordinator::new(lab.backend.clone(), events.clone(), ImpactCheckPolicy::default());
    editor.open_existing(lab.room, None).await.expect("open");
    editor.set_field(Field::Name, "Main Laboratory").expect("edit");

    let hold = lab.backend.hold(Endpoint::Update);
    let pending = tokio::spawn({
        let editor = editor.clone();
        async move { editor.save().await }
    });
    wait_for_request(&lab.backend, Endpoint::Update, 1).await;
    editor.close();
    hold.release();
    pending.await.expect("join").expect("write succeeded");

    let closed = events
        .drain()
        .into_iter()
        .filter(|e| matches!(e, Event::EditorClosed { .. }))
        .count();
    assert_eq!(closed, 1);
    assert!(!editor.is_open());
}
