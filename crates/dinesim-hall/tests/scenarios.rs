use dinesim_hall::{ArrivalPattern, CounterType, CustomerOutcome, CustomerState, HallConfig, HallSimulation};

fn config(counters: Vec<CounterType>, queue_capacity_per_server: u32, times: Vec<f64>) -> HallConfig {
    HallConfig {
        seed: 123,
        simulation_duration: 300.,
        generator_stop_time: 0.,
        queue_capacity_per_server,
        entrance_to_queue_time: 0.,
        queue_to_tail_time: 0.,
        arrivals: Some(ArrivalPattern::Times { times }),
        counters,
        ..Default::default()
    }
}

#[test]
fn test_third_arrival_queues_instead_of_balking() {
    let counters = vec![CounterType::new("X", 10., 1., 1)];
    let mut hall = HallSimulation::new(config(counters, 2, vec![0., 1., 2.])).unwrap();

    hall.step_until_time(2.).unwrap();
    {
        let facility = hall.facility();
        assert_eq!(facility.global_occupancy(), 2);
        assert_eq!(facility.counter(0).queue().length(), 2);
        assert_eq!(facility.counter(0).resource().claimed_count(), 1);
        assert_eq!(facility.customer(2).state, CustomerState::AwaitingResource);
    }

    let report = hall.run().unwrap();
    let customers = hall.customers();
    let starts: Vec<Option<f64>> = customers.iter().map(|c| c.service_start_time).collect();
    assert_eq!(starts, vec![Some(0.), Some(10.), Some(20.)]);
    let waits: Vec<Option<f64>> = customers.iter().map(|c| c.wait_time).collect();
    assert_eq!(waits, vec![Some(0.), Some(9.), Some(18.)]);
    assert!(customers.iter().all(|c| c.outcome() == Some(CustomerOutcome::Served)));

    assert_eq!(report.arrivals, 3);
    assert_eq!(report.balked, 0);
    assert_eq!(report.served, 3);
    assert_eq!(report.overall_mean_wait_time, 9.);
    assert_eq!(report.counter("X").unwrap().mean_wait_time, 9.);
    assert_eq!(report.time, 300.);
}

#[test]
fn test_full_counter_is_redrawn() {
    let mut redrawn = 0;
    for seed in 0..32 {
        let counters = vec![CounterType::new("X", 10., 0.5, 1), CounterType::new("Y", 10., 0.5, 1)];
        let mut config = config(counters, 1, vec![0., 1.]);
        config.seed = seed;
        config.entrance_to_queue_time = 27.;
        config.queue_to_tail_time = 3.;
        let mut hall = HallSimulation::new(config).unwrap();

        hall.step_until_time(1.).unwrap();
        let customers = hall.customers();
        assert_eq!(customers.len(), 2);
        // the first customer fills its counter while walking, the second one has to take the other counter
        assert_ne!(customers[0].counter, customers[1].counter);
        assert_eq!(customers[0].redraws, 0);
        if customers[1].redraws > 0 {
            redrawn += 1;
        }

        let report = hall.run().unwrap();
        assert_eq!(report.served, 2);
        assert_eq!(report.balked, 0);
    }
    assert!(redrawn > 0);
}

#[test]
fn test_capacity_directive_grants_waiting_customers() {
    let counters = vec![CounterType::new("X", 100., 1., 1)];
    let mut hall = HallSimulation::new(config(counters, 8, vec![0., 0., 0., 0.])).unwrap();

    hall.step_until_time(4.).unwrap();
    {
        let facility = hall.facility();
        let x = facility.counter_by_name("X").unwrap();
        assert_eq!(x.resource().claimed_count(), 1);
        assert_eq!(x.resource().waiting_count(), 3);
    }

    hall.directives().push("X 3");
    hall.step_until_time(5.).unwrap();
    {
        let facility = hall.facility();
        let x = facility.counter_by_name("X").unwrap();
        assert_eq!(x.resource().capacity(), 3);
        assert_eq!(x.resource().claimed_count(), 3);
        assert_eq!(x.resource().waiting_count(), 1);
        assert_eq!(x.queue().capacity(), 24);
        assert_eq!(x.server_count(), 3);
        assert_eq!(facility.total_servers(), 3);
        assert_eq!(facility.facility_capacity(), 24);
        assert_eq!(facility.directives_applied(), 1);
    }
    let customers = hall.customers();
    assert_eq!(customers[1].service_start_time, Some(5.));
    assert_eq!(customers[2].service_start_time, Some(5.));
    assert_eq!(customers[3].service_start_time, None);

    let report = hall.run().unwrap();
    assert_eq!(report.counter("X").unwrap().capacity, 3);
    assert_eq!(report.served, 4);
    // the last customer gets the first released server
    assert_eq!(hall.customers()[3].service_start_time, Some(100.));
}

#[test]
fn test_invalid_directives_are_ignored() {
    let counters = vec![CounterType::new("X", 100., 1., 1)];
    let mut hall = HallSimulation::new(config(counters, 8, vec![0., 0.])).unwrap();
    hall.step_until_time(2.).unwrap();

    let directives = hall.directives();
    for line in ["Y 2", "X 0", "X -1", "X", "X two", "X 2 3"] {
        directives.push(line);
    }
    directives.push("X 2");
    hall.step_until_time(3.).unwrap();

    {
        let facility = hall.facility();
        assert_eq!(facility.directives_rejected(), 6);
        assert_eq!(facility.directives_applied(), 1);
        assert_eq!(facility.counter(0).resource().capacity(), 2);
    }
    let report = hall.run().unwrap();
    assert_eq!(report.directives_rejected, 6);
    assert_eq!(report.served, 2);
}

#[test]
fn test_overflowing_directive_leaves_counter_unchanged() {
    let counters = vec![CounterType::new("X", 100., 1., 1)];
    let mut hall = HallSimulation::new(config(counters, 8, vec![0.])).unwrap();
    hall.step_until_time(1.).unwrap();

    let directives = hall.directives();
    directives.push("X 536870912");
    directives.push(format!("X {}", u32::MAX));
    hall.step_until_time(2.).unwrap();
    {
        let facility = hall.facility();
        assert_eq!(facility.directives_rejected(), 2);
        assert_eq!(facility.directives_applied(), 0);
        let counter = facility.counter(0);
        assert_eq!(counter.server_count(), 1);
        assert_eq!(counter.resource().capacity(), 1);
        assert_eq!(counter.queue().capacity(), 8);
        assert_eq!(facility.total_servers(), 1);
        assert_eq!(facility.facility_capacity(), 8);
    }

    directives.push("X 3");
    let report = hall.run().unwrap();
    assert_eq!(report.directives_applied, 1);
    assert_eq!(report.directives_rejected, 2);
    let x = report.counter("X").unwrap();
    assert_eq!((x.capacity, x.queue_capacity), (3, 24));
    assert_eq!(report.served, 1);
}

#[test]
fn test_arrival_balks_when_hall_is_full() {
    let counters = vec![CounterType::new("X", 10., 0.5, 1), CounterType::new("Y", 10., 0.5, 1)];
    let mut config = config(counters, 1, vec![0., 1., 2.]);
    config.entrance_to_queue_time = 27.;
    config.queue_to_tail_time = 3.;
    let mut hall = HallSimulation::new(config).unwrap();

    hall.step_until_time(2.).unwrap();
    {
        let facility = hall.facility();
        assert_eq!(facility.global_occupancy(), 2);
        assert_eq!(facility.facility_capacity(), 2);
        assert!(facility.is_full());

        let balked = facility.customer(2);
        assert_eq!(balked.state, CustomerState::Balked);
        assert_eq!(balked.counter, None);
        assert_eq!(
            balked.history,
            vec![(2., CustomerState::Arriving), (2., CustomerState::Balked)]
        );
        for counter in facility.counters() {
            assert!(!counter.queue().contains(balked.process));
        }
    }

    let report = hall.run().unwrap();
    assert_eq!(report.arrivals, 3);
    assert_eq!(report.balked, 1);
    assert_eq!(report.served, 2);
    let entered: u64 = hall.facility().counters().map(|c| c.queue().entered_count()).sum();
    assert_eq!(entered, 2);
}
