//! Notesafe core library
//!
//! Data-interchange and asset-materialization engine for a personal notes
//! application: exports notes, quick notes, folders, tags, tag associations
//! and their binary assets into a single portable archive, and reimports
//! that archive to reconstruct application state.

pub mod config;
pub mod content;
pub mod database;
pub mod error;
pub mod services;
pub mod storage;
