use std::rc::Rc;

use dinesim_core::{Queue, SimError, Simulation};

fn spawn_visitor(sim: &mut Simulation, queue: &Rc<Queue>, name: &str, arrival: f64, stay: f64) {
    let queue = queue.clone();
    sim.spawn_process(name, move |ctx| async move {
        ctx.hold(arrival).await?;
        ctx.enter(&queue);
        ctx.hold(stay).await?;
        ctx.leave(&queue)
    });
}

#[test]
fn test_members_keep_arrival_order() {
    let mut sim = Simulation::new(42);
    let line = sim.create_queue("line", 3).unwrap();
    let a = sim.create_context("a");
    let b = sim.create_context("b");
    let c = sim.create_context("c");

    a.enter(&line);
    b.enter(&line);
    c.enter(&line);
    assert_eq!(line.members(), vec![a.id(), b.id(), c.id()]);
    assert_eq!(line.position(c.id()), Some(2));

    b.leave(&line).unwrap();
    assert_eq!(line.members(), vec![a.id(), c.id()]);
    assert_eq!(line.position(c.id()), Some(1));
    assert!(!line.contains(b.id()));
    assert_eq!(line.entered_count(), 3);

    assert_eq!(
        b.leave(&line),
        Err(SimError::NotPresent {
            queue: "line".to_string(),
            process: b.id()
        })
    );
}

#[test]
fn test_capacity_is_advisory() {
    let mut sim = Simulation::new(42);
    let line = sim.create_queue("line", 1).unwrap();
    let a = sim.create_context("a");
    let b = sim.create_context("b");

    a.enter(&line);
    b.enter(&line);
    assert_eq!(line.length(), 2);
    assert_eq!(line.capacity(), 1);

    line.set_capacity(5).unwrap();
    assert_eq!(line.capacity(), 5);
    assert!(line.set_capacity(0).is_err());
    assert!(sim.create_queue("empty", 0).is_err());
}

#[test]
fn test_length_and_stay_statistics() {
    let mut sim = Simulation::new(42);
    let line = sim.create_queue("line", 10).unwrap();

    spawn_visitor(&mut sim, &line, "first", 0., 4.);
    spawn_visitor(&mut sim, &line, "second", 2., 4.);
    sim.run(8.).unwrap();

    assert!(line.is_empty());
    // length 1 on [0, 2), 2 on [2, 4), 1 on [4, 6), 0 on [6, 8)
    assert_eq!(line.mean_length(), 1.);
    assert_eq!(line.mean_stay(), 4.);
    assert_eq!(line.stays().count(), 2);
    assert_eq!(line.entered_count(), 2);
}
