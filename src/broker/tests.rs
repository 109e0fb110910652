use std::sync::Arc;
use std::thread;

use super::command::{Command, parse_keywords, split_fields};
use super::topic::{Topic, TopicRegistry};
use super::{Broker, EXIT_REPLY, Event, lock};
use crate::client::{Connection, Outbound};
use crate::utils::error::{BrokerError, USAGE};
use tokio::sync::mpsc;

fn connect(broker: &mut Broker, identity: &str) -> mpsc::UnboundedReceiver<Outbound> {
    let (tx, rx) = mpsc::unbounded_channel::<Outbound>();
    broker.register_connection(Connection::new(identity, tx));
    rx
}

fn drain(rx: &mut mpsc::UnboundedReceiver<Outbound>) -> Vec<String> {
    let mut texts = Vec::new();
    while let Ok(frame) = rx.try_recv() {
        if let Outbound::Text(text) = frame {
            texts.push(text);
        }
    }
    texts
}

#[test]
fn test_new_broker_starts_empty() {
    let broker = Broker::new();
    assert!(broker.topics.is_empty());
    assert!(broker.subscriptions.is_empty());
    assert!(broker.sessions.is_empty());
}

#[test]
fn test_topic_new_collapses_duplicate_keywords() {
    let topic = Topic::new(0, "sports", ["soccer", "tennis", "soccer"]);
    assert_eq!(topic.name, "sports");
    assert_eq!(topic.keywords, vec!["soccer", "tennis"]);
    assert_eq!(
        topic.to_string(),
        "Topic [sports] with keywords [soccer, tennis]"
    );
}

#[test]
fn test_topic_registry_rejects_duplicate_names() {
    let mut topics = TopicRegistry::new();
    topics.create("sports", vec!["soccer".into()]).unwrap();

    let err = topics.create("sports", vec!["golf".into()]).unwrap_err();
    assert_eq!(err, BrokerError::TopicExists("sports".to_string()));
    assert_eq!(topics.len(), 1);
    assert_eq!(topics.lookup("sports").unwrap().keywords, vec!["soccer"]);
}

#[test]
fn test_topic_registry_keeps_creation_order() {
    let mut topics = TopicRegistry::new();
    topics.create("b", vec!["x".into()]).unwrap();
    topics.create("a", vec!["y".into()]).unwrap();
    topics.create("c", vec!["x".into()]).unwrap();

    let names: Vec<_> = topics.all().iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["b", "a", "c"]);
    let tagged: Vec<_> = topics.with_keyword("x").map(|t| t.name.as_str()).collect();
    assert_eq!(tagged, vec!["b", "c"]);
    assert!(topics.lookup("Sports").is_none());
}

#[test]
fn test_event_rendering_and_id() {
    let topic = Topic::new(0, "sports", ["soccer"]);
    let event = Event::new(&topic, "GameNight", "Come watch");
    assert_eq!(event.to_string(), "Event [GameNight] for [sports]: Come watch");
    assert_eq!(event.id, Event::id_for("GameNight"));
    assert_eq!(event.topic_id, topic.id);
}

#[test]
fn test_split_fields_keeps_remainder() {
    assert_eq!(
        split_fields("publish sports GameNight Come watch  now", 4),
        vec!["publish", "sports", "GameNight", "Come watch  now"]
    );
    assert_eq!(split_fields("  login   alice \r\n", 4), vec!["login", "alice"]);
    assert!(split_fields("   ", 4).is_empty());
}

#[test]
fn test_parse_keywords() {
    assert_eq!(parse_keywords("soccer, tennis,,soccer"), vec!["soccer", "tennis"]);
    assert!(parse_keywords(" , ").is_empty());
}

#[test]
fn test_command_parse() {
    assert_eq!(
        Command::parse("publish sports GameNight Come watch").unwrap(),
        Command::Publish {
            topic: "sports".into(),
            title: "GameNight".into(),
            content: "Come watch".into(),
        }
    );
    assert_eq!(
        "subscribe keywords soccer,golf".parse::<Command>().unwrap(),
        Command::SubscribeKeywords {
            keywords: vec!["soccer".into(), "golf".into()],
        }
    );
    assert_eq!(Command::parse("unsubscribe *").unwrap(), Command::UnsubscribeAll);
    assert_eq!(Command::parse("exit").unwrap(), Command::Exit);
    assert_eq!(
        Command::parse("subscribe things sports").unwrap_err(),
        BrokerError::InvalidSelector
    );
    assert_eq!(Command::parse("publish sports").unwrap_err(), BrokerError::Usage);
    assert_eq!(Command::parse("advertise t ,").unwrap_err(), BrokerError::Usage);
    assert_eq!(
        Command::parse("listSubscribedTopics extra").unwrap_err(),
        BrokerError::Usage
    );
    assert_eq!(Command::parse("dance").unwrap_err(), BrokerError::Usage);
    assert_eq!(Command::parse("").unwrap_err(), BrokerError::Usage);
}

#[test]
fn test_concrete_scenario() {
    let mut broker = Broker::new();
    let mut rx = connect(&mut broker, "10.0.0.1:4000");
    let id = "10.0.0.1:4000";

    assert_eq!(broker.handle(id, "login alice"), "User created.");
    assert_eq!(broker.handle(id, "advertise sports soccer,tennis"), "Topic Created.");
    assert_eq!(
        drain(&mut rx),
        vec!["New Topic: sports\nKeywords: [soccer, tennis]"]
    );

    assert_eq!(
        broker.handle(id, "subscribe keywords soccer"),
        "Subscribed to all topics with keywords: soccer"
    );
    assert_eq!(broker.subscriptions.len(), 1);
    let alice = broker.subscriptions.lookup("alice").unwrap();
    let sports = broker.topics.lookup("sports").unwrap().id;
    assert!(broker.subscriptions.is_subscribed(alice, sports));

    assert_eq!(broker.handle(id, "publish sports GameNight Come watch"), "Event Published");
    assert_eq!(
        drain(&mut rx),
        vec!["Event [GameNight] for [sports]: Come watch"]
    );
}

#[test]
fn test_commands_require_login() {
    let mut broker = Broker::new();
    let _rx = connect(&mut broker, "a");

    assert_eq!(
        broker.handle("a", "listAllTopics"),
        BrokerError::NoUser.to_string()
    );
    assert_eq!(broker.handle("a", "advertise t k"), BrokerError::NoUser.to_string());
    assert_eq!(broker.handle("a", "exit"), EXIT_REPLY);
    assert_eq!(broker.handle("a", "bogus"), USAGE);
    assert!(broker.topics.is_empty());
}

#[test]
fn test_subscribe_topic_is_idempotent() {
    let mut broker = Broker::new();
    broker.handle("a", "login alice");
    broker.handle("a", "advertise sports soccer");

    assert_eq!(
        broker.handle("a", "subscribe topic sports"),
        "You are subscribed to topic: sports"
    );
    assert_eq!(
        broker.handle("a", "subscribe topic sports"),
        "Error: Already subscribed to topic sports."
    );
    let alice = broker.subscriptions.lookup("alice").unwrap();
    assert_eq!(broker.subscriptions.user(alice).topics().len(), 1);

    assert_eq!(
        broker.handle("a", "subscribe topic golf"),
        "Error: Topic golf does not exist."
    );
}

#[test]
fn test_readvertise_is_rejected() {
    let mut broker = Broker::new();
    broker.handle("a", "login alice");
    broker.handle("a", "advertise sports soccer");

    assert_eq!(
        broker.handle("a", "advertise sports golf"),
        "Error: Topic sports already exists."
    );
    assert_eq!(broker.topics.len(), 1);
    assert_eq!(broker.topics.lookup("sports").unwrap().keywords, vec!["soccer"]);
}

#[test]
fn test_keyword_subscription_matches_future_topics() {
    let mut broker = Broker::new();
    broker.handle("a", "login alice");
    broker.handle("a", "subscribe keywords soccer");
    broker.handle("b", "login bob");

    broker.handle("b", "advertise sports soccer,tennis");
    broker.handle("b", "advertise music jazz");

    let alice = broker.subscriptions.lookup("alice").unwrap();
    let bob = broker.subscriptions.lookup("bob").unwrap();
    let sports = broker.topics.lookup("sports").unwrap().id;
    let music = broker.topics.lookup("music").unwrap().id;

    assert!(broker.subscriptions.is_subscribed(alice, sports));
    assert!(!broker.subscriptions.is_subscribed(alice, music));
    assert!(!broker.subscriptions.is_subscribed(bob, sports));

    let names: Vec<_> = broker
        .subscriptions
        .subscribers(sports)
        .map(|u| u.name.as_str())
        .collect();
    assert_eq!(names, vec!["alice"]);
}

#[test]
fn test_unsubscribe_flow() {
    let mut broker = Broker::new();
    broker.handle("a", "login alice");
    assert_eq!(broker.handle("a", "unsubscribe sports"), "No subscribed topics");
    assert_eq!(broker.handle("a", "unsubscribe *"), "No subscribed topics");

    broker.handle("a", "advertise sports soccer");
    broker.handle("a", "advertise music jazz");
    broker.handle("a", "subscribe topic sports");

    assert_eq!(broker.handle("a", "unsubscribe golf"), "Topic golf does not exist.");
    assert_eq!(
        broker.handle("a", "unsubscribe music"),
        "Topic music not in subscriptions"
    );
    assert_eq!(broker.handle("a", "unsubscribe sports"), "Unsubscribed successfully");

    broker.handle("a", "subscribe keywords jazz,soccer");
    assert_eq!(broker.handle("a", "unsubscribe *"), "Unsubscribed from all topics");
    assert_eq!(
        broker.handle("a", "listSubscribedTopics"),
        "No subscribed topics to display."
    );

    // keywords were forgotten too
    broker.handle("a", "advertise football soccer");
    let alice = broker.subscriptions.lookup("alice").unwrap();
    assert!(broker.subscriptions.user(alice).topics().is_empty());
}

#[test]
fn test_listing() {
    let mut broker = Broker::new();
    broker.handle("a", "login alice");
    assert_eq!(broker.handle("a", "listAllTopics"), "No topics exist.");

    broker.handle("a", "advertise sports soccer,tennis");
    broker.handle("a", "advertise music jazz");
    broker.handle("a", "subscribe topic music");

    assert_eq!(
        broker.handle("a", "listAllTopics"),
        "All Topics:\n    Topic [sports] with keywords [soccer, tennis]\n    Topic [music] with keywords [jazz]"
    );
    assert_eq!(
        broker.handle("a", "listSubscribedTopics"),
        "Subscribed Topics:\n    Topic [music] with keywords [jazz]"
    );
}

#[test]
fn test_publish_to_missing_topic() {
    let mut broker = Broker::new();
    broker.handle("a", "login alice");
    assert_eq!(
        broker.handle("a", "publish nowhere Title some content"),
        "Topic does not exist."
    );
}

#[test]
fn test_offline_events_are_replayed_once_in_order() {
    let mut broker = Broker::new();
    let rx_a = connect(&mut broker, "a");
    let _rx_b = connect(&mut broker, "b");

    broker.handle("a", "login alice");
    broker.handle("b", "login bob");
    broker.handle("b", "advertise sports soccer");
    broker.handle("a", "subscribe topic sports");

    // alice goes away
    drop(rx_a);
    broker.remove_connection("a");
    let alice = broker.subscriptions.lookup("alice").unwrap();
    assert!(!broker.is_online(alice));

    broker.handle("b", "publish sports First one");
    broker.handle("b", "publish sports Second two");
    assert_eq!(broker.subscriptions.user(alice).cached(), 2);

    let mut rx_c = connect(&mut broker, "c");
    assert_eq!(
        broker.handle("c", "login alice"),
        "Login successful. Welcome back.\n     Event [First] for [sports]: one\n     Event [Second] for [sports]: two"
    );
    assert_eq!(broker.handle("c", "login alice"), "Login successful. Welcome back.");
    assert!(drain(&mut rx_c).is_empty());
    assert_eq!(broker.subscriptions.user(alice).cached(), 0);
}

#[test]
fn test_uninterested_offline_users_are_not_cached() {
    let mut broker = Broker::new();
    broker.handle("a", "login alice");
    let _rx_b = connect(&mut broker, "b");
    broker.handle("b", "login bob");
    broker.handle("b", "advertise sports soccer");

    let event = Event::new(broker.topics.lookup("sports").unwrap(), "T", "c");
    let outcome = broker.notify(event);
    assert_eq!(outcome.delivered, 0);
    assert_eq!(outcome.cached, 0);

    let alice = broker.subscriptions.lookup("alice").unwrap();
    assert_eq!(broker.subscriptions.user(alice).cached(), 0);
}

#[test]
fn test_multi_device_delivery() {
    let mut broker = Broker::new();
    let mut phone = connect(&mut broker, "phone");
    let mut laptop = connect(&mut broker, "laptop");

    broker.handle("phone", "login alice");
    broker.handle("laptop", "login alice");
    broker.handle("phone", "advertise sports soccer");
    broker.handle("phone", "subscribe topic sports");
    drain(&mut phone);
    drain(&mut laptop);

    broker.handle("laptop", "publish sports Goal scored");
    assert_eq!(drain(&mut phone), vec!["Event [Goal] for [sports]: scored"]);
    assert_eq!(drain(&mut laptop), vec!["Event [Goal] for [sports]: scored"]);

    let alice = broker.subscriptions.lookup("alice").unwrap();
    let mut bound = broker.identities_of(alice);
    bound.sort();
    assert_eq!(bound, vec!["laptop", "phone"]);
}

#[test]
fn test_relogin_moves_identity() {
    let mut broker = Broker::new();
    broker.handle("a", "login alice");
    assert_eq!(broker.handle("a", "login bob"), "User created.");

    let alice = broker.subscriptions.lookup("alice").unwrap();
    let bob = broker.subscriptions.lookup("bob").unwrap();
    assert!(broker.identities_of(alice).is_empty());
    assert_eq!(broker.identities_of(bob), vec!["a"]);
    assert_eq!(broker.username_of("a"), Some("bob"));
}

#[test]
fn test_closed_connection_caches_instead_of_losing() {
    let mut broker = Broker::new();
    let rx_a = connect(&mut broker, "a");
    broker.handle("a", "login alice");
    broker.handle("a", "advertise sports soccer");
    broker.handle("a", "subscribe topic sports");

    // writer gone but the connection was never cleaned up
    drop(rx_a);
    broker.handle("a", "publish sports Late news");

    let alice = broker.subscriptions.lookup("alice").unwrap();
    assert_eq!(broker.subscriptions.user(alice).cached(), 1);

    let report = broker.sweep();
    assert_eq!(report.pruned, 1);
    assert_eq!(broker.username_of("a"), None);
    assert_eq!(broker.subscriptions.user(alice).cached(), 1);
}

#[test]
fn test_sweep_flushes_backlog_of_online_user() {
    let mut broker = Broker::new();
    broker.handle("a", "login alice");
    broker.handle("a", "advertise sports soccer");
    broker.handle("a", "subscribe topic sports");
    broker.handle("a", "publish sports Early bird");

    let alice = broker.subscriptions.lookup("alice").unwrap();
    assert_eq!(broker.subscriptions.user(alice).cached(), 1);

    // identity "a" had no connection yet; it comes online now
    let mut rx = connect(&mut broker, "a");
    let report = broker.sweep();
    assert_eq!(report.flushed, 1);
    assert_eq!(drain(&mut rx), vec!["Event [Early] for [sports]: bird"]);
    assert_eq!(broker.subscriptions.user(alice).cached(), 0);
}

#[test]
fn test_backlog_precedes_new_event() {
    let mut broker = Broker::new();
    broker.handle("a", "login alice");
    broker.handle("a", "advertise sports soccer");
    broker.handle("a", "subscribe topic sports");
    broker.handle("a", "publish sports One 1");

    let mut rx = connect(&mut broker, "a");
    broker.handle("a", "publish sports Two 2");

    assert_eq!(
        drain(&mut rx),
        vec![
            "Event [One] for [sports]: 1",
            "Event [Two] for [sports]: 2"
        ]
    );
}

#[test]
fn test_concurrent_subscribers_are_not_lost() {
    const WORKERS: usize = 32;

    let broker = Broker::shared();
    {
        let mut b = lock(&broker);
        b.handle("admin", "login admin");
        b.handle("admin", "advertise shared k");
    }

    let handles: Vec<_> = (0..WORKERS)
        .map(|i| {
            let broker = Arc::clone(&broker);
            thread::spawn(move || {
                let identity = format!("worker-{i}");
                lock(&broker).handle(&identity, &format!("login user{i}"));
                lock(&broker).handle(&identity, "subscribe topic shared")
            })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().unwrap(), "You are subscribed to topic: shared");
    }

    let b = lock(&broker);
    let topic = b.topics.lookup("shared").unwrap().id;
    assert_eq!(b.subscriptions.subscribers(topic).count(), WORKERS);
}
