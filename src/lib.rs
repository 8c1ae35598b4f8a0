//! Pathforge - Adaptive Learning-Path Planner

pub mod catalog;
pub mod core;
pub mod datagen;
pub mod graph;
pub mod learner;
pub mod planner;
pub mod session;
pub mod solver;
pub mod sprint;
