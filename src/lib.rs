//! `trafficlight` - a randomized traffic light observed through a blocking channel
//!
//! This library provides a generic [`BlockingChannel`](channel::BlockingChannel)
//! and a [`TrafficLight`](phase::TrafficLight) actor that toggles between red
//! and green on its own thread, publishing each change to that channel so
//! other threads can block until the light turns green.

pub mod channel;
pub mod cli;
pub mod config;
pub mod error;
pub mod observability;
pub mod phase;
pub mod simulation;
