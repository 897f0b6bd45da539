use glam::Vec3;

use rewindable::{
    AgentHost, AgentId, GameStatus, ItemHost, ItemId, ItemKind, ItemParent, Pose, RestoreError, Session,
    SessionConfig, SimAgent, SimItem, SimWorld,
};

struct Level {
    session: Session,
    world: SimWorld,
    robots: Vec<AgentId>,
    items: Vec<ItemId>,
}

impl Level {
    fn new(robots: usize, items: usize) -> Self {
        let config = SessionConfig::default();
        let mut session = Session::new(config).unwrap();
        let mut world = SimWorld::new(config.hold_offset);

        let robots = (0..robots)
            .map(|n| {
                let id = session.register_agent().unwrap();
                world.add_agent(id, Pose::at(Vec3::new(0.0, 0.0, n as f32 * 4.0)));
                id
            })
            .collect();
        let items = (0..items)
            .map(|n| {
                let z = n as f32 * 4.0;
                let id = session.register_item(ItemKind::Box, Vec3::new(8.0, 0.0, z)).unwrap();
                world.add_item(id, Pose::at(Vec3::new(2.0, 0.0, z)));
                id
            })
            .collect();

        Self {
            session,
            world,
            robots,
            items,
        }
    }

    fn step(&mut self, seconds: f64) {
        self.session.tick(&mut self.world, seconds);
    }

    fn move_robot(&mut self, robot: usize, x: f32) {
        let id = self.robots[robot];
        let z = self.world.agent(id).unwrap().pose.position.z;
        self.world.move_agent(id, Pose::at(Vec3::new(x, 0.0, z))).unwrap();
    }

    fn observe(&self) -> (Vec<SimAgent>, Vec<SimItem>) {
        let agents = self.robots.iter().map(|id| self.world.agent(*id).unwrap().clone()).collect();
        let items = self.items.iter().map(|id| self.world.item(*id).unwrap().clone()).collect();
        (agents, items)
    }

    /// One robot walks to its item, carries it to the target and drops it.
    fn deliver(&mut self, robot: usize) {
        let (agent, item) = (self.robots[robot], self.items[robot]);
        let z = self.world.agent(agent).unwrap().pose.position.z;
        for x in [0.5_f32, 1.0, 1.5, 2.0] {
            self.move_robot(robot, x);
            self.step(0.1);
        }
        self.world.pick_up(agent, item).unwrap();
        for x in [3.0_f32, 4.0, 5.0, 6.0, 7.0, 8.0] {
            self.move_robot(robot, x);
            self.step(0.1);
        }
        self.world.drop_item(agent, Pose::at(Vec3::new(8.0, 0.0, z))).unwrap();
        self.step(0.1);
    }
}

#[test]
fn scrub_restores_nearest_before_and_recording_discards_the_old_future() {
    let mut level = Level::new(1, 0);
    let robot = level.robots[0];

    level.session.play(1.0);
    level.session.record_now(&mut level.world).unwrap();
    level.move_robot(0, 1.0);
    level.step(1.0);
    level.move_robot(0, 2.0);
    level.step(1.0);

    level.session.jump_to(&mut level.world, 1.5);
    assert_eq!(level.world.agent_pose(robot).unwrap().position, Vec3::new(1.0, 0.0, 0.0));
    assert!(!level.session.clock().is_playing());

    level.session.play(1.0);
    level.move_robot(0, 5.0);
    let pass = level.session.record_now(&mut level.world).unwrap();
    assert_eq!(pass.truncated, 1);

    let at_two = level.session.agent_snapshot_at(robot, 2.0).unwrap();
    assert_eq!(at_two.position(), Vec3::new(5.0, 0.0, 0.0));
}

#[test]
fn restoring_twice_gives_the_same_world() {
    let mut level = Level::new(2, 2);
    level.session.play(1.0);
    level.deliver(0);
    level.deliver(1);

    for t in [0.0, 0.25, 0.45, 0.8, 1.05, 1.3, 1.9, 2.2, 9.0] {
        level.session.jump_to(&mut level.world, t);
        let first = level.observe();
        level.session.jump_to(&mut level.world, t);
        let second = level.observe();
        assert_eq!(first, second, "restore at {t} is not idempotent");
    }
}

#[test]
fn held_items_always_sit_on_a_live_hold_point() {
    let mut level = Level::new(2, 2);
    level.session.play(1.0);
    level.deliver(0);
    level.deliver(1);

    for tenth in 0..=25 {
        let t = f64::from(tenth) / 10.0;
        let report = level.session.jump_to(&mut level.world, t);
        for (&item, &agent) in &report.held {
            let hold = level.world.hold_point(agent).expect("holder must be live");
            assert_eq!(level.world.item_parent(item), ItemParent::HoldPoint(agent), "at {t}");
            assert_eq!(level.world.carried_item(agent), Some(item), "at {t}");
            assert_eq!(level.world.item(item).unwrap().pose, hold, "at {t}");
            assert!(!level.world.item(item).unwrap().physics);
        }
        for &item in &level.items {
            if !report.held.contains_key(&item) {
                assert_eq!(level.world.item_parent(item), ItemParent::Free, "at {t}");
            }
        }
    }
}

#[test]
fn carried_item_tracks_the_robot_after_scrub() {
    let mut level = Level::new(1, 1);
    level.session.play(1.0);
    level.deliver(0);
    let (robot, item) = (level.robots[0], level.items[0]);

    // Mid-carry: the robot is at x = 4.0 after the second carry step.
    level.session.jump_to(&mut level.world, 0.6);
    assert_eq!(level.world.agent_pose(robot).unwrap().position.x, 4.0);
    assert_eq!(level.world.item_pose(item).unwrap().position, Vec3::new(4.0, 1.5, 0.0));

    // Before the pickup the item is back on the ground where it started.
    level.session.jump_to(&mut level.world, 0.2);
    assert_eq!(level.world.carried_item(robot), None);
    assert_eq!(level.world.item_pose(item).unwrap().position, Vec3::new(2.0, 0.0, 0.0));
    assert!(level.world.item(item).unwrap().physics);
}

#[test]
fn victory_follows_the_restored_world() {
    let mut level = Level::new(1, 1);
    level.session.play(1.0);
    level.deliver(0);
    assert_eq!(level.session.status(), GameStatus::Victory);

    level.session.jump_to(&mut level.world, 0.5);
    assert_eq!(level.session.status(), GameStatus::Playing);

    level.session.jump_to(&mut level.world, 5.0);
    assert_eq!(level.session.status(), GameStatus::Victory);
    assert!(level.world.item(level.items[0]).unwrap().completed);
}

#[test]
fn removed_holder_leaves_item_on_the_ground() {
    let mut level = Level::new(1, 1);
    level.session.play(1.0);
    level.deliver(0);
    let (robot, item) = (level.robots[0], level.items[0]);

    level.session.unregister_agent(robot).unwrap();
    level.world.remove_agent(robot);

    let report = level.session.jump_to(&mut level.world, 0.6);
    assert!(report
        .issues
        .contains(&RestoreError::DanglingHolder { item, holder: robot }));
    assert_eq!(level.world.item_parent(item), ItemParent::Free);
    assert!(level.world.item(item).unwrap().physics);
}

#[test]
fn scrubbing_never_records() {
    let mut level = Level::new(2, 2);
    level.session.play(1.0);
    level.deliver(0);
    let before = level.session.stats();

    for t in [0.3, 1.1, 0.0, 10.0, -4.0] {
        level.session.jump_to(&mut level.world, t);
    }
    let after = level.session.stats();
    assert_eq!(before.agents, after.agents);
    assert_eq!(before.items, after.items);
}

#[test]
fn restore_while_playing_pauses_first() {
    let mut level = Level::new(1, 0);
    level.session.play(1.0);
    level.step(0.5);

    let report = level.session.restore_all(&mut level.world, 0.2);
    assert!(report.forced_pause);
    assert!(!level.session.clock().is_playing());
}

#[test]
fn playing_to_the_end_pauses_after_recording_the_last_frame() {
    let mut level = Level::new(1, 0);
    level.session.set_max_time(1.0);
    level.session.play(1.0);
    let outcome = level.session.tick(&mut level.world, 5.0);

    assert!(outcome.advance.unwrap().paused_at_bound);
    assert_eq!(outcome.record.unwrap().tick.index(), 10);
    assert!(!level.session.clock().is_playing());
    assert!(level.session.agent_snapshot_at(level.robots[0], 1.0).is_some());
}

#[test]
fn duplicate_registration_is_rejected() {
    let mut level = Level::new(1, 1);
    let err = level.session.insert_agent(level.robots[0]).unwrap_err();
    assert!(err.is_validation());
    assert!(err.to_string().contains("already registered"));
}

#[test]
fn host_chosen_ids_cannot_exhaust_the_id_space() {
    let mut level = Level::new(1, 0);
    let err = level.session.insert_agent(AgentId::new(u32::MAX)).unwrap_err();
    assert!(err.is_validation());
    assert!(!level.session.registry().contains_agent(AgentId::new(u32::MAX)));

    let next = level.session.register_agent().unwrap();
    assert_eq!(next, AgentId::new(1));
    assert!(level.session.registry().contains_agent(level.robots[0]));
    assert_eq!(level.session.registry().agent_count(), 2);
}
