use std::cell::RefCell;
use std::rc::Rc;

use stage_ecs::prelude::*;

fn stage() -> Stage {
    Stage::new(4, 16 << 20).unwrap()
}

#[test]
fn test_add_component_moves_entity_between_pools() {
    let mut stage = stage();
    stage.scene_new("A").unwrap();

    let t = ArchetypeMask::of(ComponentKind::Transform);
    let tm = t.with(ComponentKind::Mesh);
    let e = stage.new_entity(t).unwrap();
    stage.add_component(e, Mesh::default()).unwrap();

    let scene = stage.current().unwrap();
    assert_eq!(scene.archetype_of(e), Some(tm));
    let (pool, _) = scene.location_of(e).unwrap();
    assert_eq!(scene.pools()[pool].mask(), tm);
    assert_eq!(scene.pool_len(t), 0);
    assert_eq!(scene.pool_len(tm), 1);

    let mut query = stage.query(t).unwrap();
    let mut matches = Vec::new();
    while query.next() {
        matches.push(query.entity());
    }
    assert_eq!(matches, vec![e]);
}

#[test]
fn test_duplicate_scene_name_is_fatal() {
    let mut stage = stage();
    stage.scene_new("A").unwrap();

    let err = stage.scene_new("A").unwrap_err();
    assert_eq!(err, EcsError::DuplicateScene("A".into()));
    assert!(err.is_fatal());
    assert_eq!(stage.active_scene_names(), vec!["A"]);
    assert_eq!(stage.free_slots(), 3);
}

#[test]
fn test_capacity_exhaustion_and_reuse() {
    let mut stage = Stage::new(2, 2 << 20).unwrap();
    stage.scene_new("one").unwrap();
    stage.scene_new("two").unwrap();

    let err = stage.scene_new("three").unwrap_err();
    assert_eq!(err, EcsError::SceneCapacityExhausted { capacity: 2 });
    assert!(err.is_fatal());

    stage.scene_remove("two").unwrap();
    assert_eq!(stage.current_name(), Some("one"));
    stage.scene_new("three").unwrap();
    assert_eq!(stage.active_scene_names(), vec!["one", "three"]);
    assert_eq!(stage.current_name(), Some("three"));
}

#[test]
fn test_scenes_are_isolated() {
    let mut stage = stage();
    stage.scene_new("menu").unwrap();
    let button = stage.new_entity(ArchetypeMask::EMPTY).unwrap();

    stage.scene_new("level").unwrap();
    stage.new_entity(ArchetypeMask::EMPTY).unwrap();
    stage.new_entity(ArchetypeMask::EMPTY).unwrap();

    assert_eq!(stage.scene("menu").unwrap().entity_count(), 1);
    assert_eq!(stage.scene("level").unwrap().entity_count(), 2);

    stage.set_current("menu").unwrap();
    assert!(stage.current().unwrap().is_valid(button));
}

#[test]
fn test_run_frame_in_registration_order() {
    let mut stage = stage();
    stage.scene_new("main").unwrap();

    let log = Rc::new(RefCell::new(Vec::new()));
    for name in ["input", "physics", "render"] {
        let log = Rc::clone(&log);
        stage
            .add_system(name, move |_: &mut Scene, _: &FrameContext<'_>| {
                log.borrow_mut().push(name);
                name != "physics"
            })
            .unwrap();
    }

    let mut clock = FrameClock::new();
    let input = InputState::new();
    for _ in 0..2 {
        clock.advance(std::time::Duration::from_millis(16));
        let frame = clock.context(WindowSize::new(800, 600), &input);
        let report = stage.run_frame(&frame).unwrap();
        assert_eq!(report.ran, 3);
        assert_eq!(report.failed, vec!["physics".to_string()]);
    }

    assert_eq!(
        *log.borrow(),
        vec!["input", "physics", "render", "input", "physics", "render"]
    );
}

#[test]
fn test_systems_see_frame_input() {
    let mut stage = stage();
    stage.scene_new("main").unwrap();
    let player = stage
        .new_entity(ArchetypeMask::from_kinds(&[
            ComponentKind::Transform,
            ComponentKind::Player,
        ]))
        .unwrap();

    stage
        .add_system("player_move", |scene: &mut Scene, frame: &FrameContext<'_>| {
            let mut query = scene.query(ArchetypeMask::of(ComponentKind::Player));
            while query.next() {
                let speed = query.get::<Player>().map_or(0.0, |p| p.speed);
                if frame.key_down(KeyCode::W) {
                    if let Some(transform) = query.get_mut::<Transform>() {
                        transform.translation.z -= speed * frame.delta;
                    }
                    query.mark_dirty();
                }
            }
            true
        })
        .unwrap();

    let mut input = InputState::new();
    input.press(KeyCode::W);
    let mut clock = FrameClock::new();
    clock.advance(std::time::Duration::from_secs(1));
    stage
        .run_frame(&clock.context(WindowSize::new(800, 600), &input))
        .unwrap();

    let z = stage.get_component::<Transform>(player).unwrap().translation.z;
    assert!((z + Player::default().speed).abs() < 1e-4);
}

#[test]
fn test_resources_bound_then_released() {
    let mut stage = stage();
    let mut table = ResourceTable::new();
    let hero = table.insert(ResourceKind::Mesh, "hero");
    let walk = table.insert(ResourceKind::Clip, "walk");
    let step = table.insert(ResourceKind::Sound, "step");

    let scene = stage.scene_new("A").unwrap();
    let mask = ArchetypeMask::from_kinds(&[
        ComponentKind::Transform,
        ComponentKind::Mesh,
        ComponentKind::Clip,
        ComponentKind::AudioSource,
    ]);
    let e = scene.new_entity(mask).unwrap();
    let other = scene
        .new_entity(ArchetypeMask::of(ComponentKind::Mesh))
        .unwrap();

    assert!(scene.bind_resource(e, ResourceKind::Mesh, "hero", &table));
    assert!(scene.bind_resource(e, ResourceKind::Clip, "walk", &table));
    assert!(scene.bind_resource(e, ResourceKind::Sound, "step", &table));
    assert!(scene.bind_resource(other, ResourceKind::Mesh, "hero", &table));
    // Unknown label is skipped without touching the component
    assert!(!scene.bind_resource(other, ResourceKind::Mesh, "villain", &table));
    assert_eq!(scene.get_component::<Mesh>(other).unwrap().resource, Some(hero));

    let mut released = Vec::new();
    assert_eq!(scene.unmake_refs(|handle| released.push(handle)), 4);
    released.sort_by_key(|h| (h.index(), format!("{:?}", h.kind())));
    assert_eq!(released, vec![hero, hero, walk, step]);

    stage.scene_remove("A").unwrap();
    assert_eq!(stage.free_slots(), 4);
    assert!(stage.current().is_none());
}

#[test]
fn test_stage_from_config() {
    let config = StageConfig::from_json_str(
        r#"{ "scene_capacity": 2, "arena_bytes": 4194304, "gravity": [0.0, -1.0, 0.0] }"#,
    )
    .unwrap();
    let mut stage = Stage::with_config(config).unwrap();
    let scene = stage.scene_new("moon").unwrap();
    assert_eq!(scene.gravity(), Vec3::new(0.0, -1.0, 0.0));
    assert_eq!(scene.arena().budget(), 2 << 20);
}

#[test]
fn test_main_camera_through_stage() {
    let mut stage = stage();
    assert_eq!(stage.main_camera(), None);
    stage.scene_new("A").unwrap();
    let camera = stage
        .new_entity(ArchetypeMask::from_kinds(&[
            ComponentKind::Transform,
            ComponentKind::Camera,
        ]))
        .unwrap();
    stage.set_main_camera(camera).unwrap();
    assert_eq!(stage.main_camera(), Some(camera));

    let (cam, transform) = stage.current().unwrap().main_camera_data().unwrap();
    assert_eq!(cam, Camera::default());
    assert_eq!(transform.translation, Vec3::ZERO);
}

#[test]
fn test_scene_memory_is_allocated_at_boot() {
    let mut stage = stage();
    let scene = stage.scene_new("A").unwrap();
    let backing = scene.arena().allocated_bytes();
    assert!(backing >= 4 << 20);

    let t = ArchetypeMask::of(ComponentKind::Transform);
    let entities: Vec<Entity> = (0..1000).map(|_| scene.new_entity(t).unwrap()).collect();
    for e in &entities {
        scene.add_component(*e, Mesh::default()).unwrap();
    }
    for e in entities.iter().step_by(3) {
        scene.remove_entity(*e);
    }

    // Pools grew and migrated inside the region that existed from the start
    assert!(scene.arena().used() > 0);
    assert_eq!(scene.arena().allocated_bytes(), backing);
}

#[test]
fn test_full_region_refuses_to_grow() {
    let mut stage = Stage::new(1, 64 << 10).unwrap();
    let scene = stage.scene_new("small").unwrap();
    let backing = scene.arena().allocated_bytes();

    let t = ArchetypeMask::of(ComponentKind::Transform);
    let err = loop {
        if let Err(err) = scene.new_entity(t) {
            break err;
        }
    };
    assert!(matches!(err, EcsError::ArenaExhausted { .. }));
    assert_eq!(scene.arena().allocated_bytes(), backing);
}
