//! tubemaster-core
//!
//! YouTube チャンネル運用の自動化ライブラリ。
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（ids, row, state, profile, script, content, stats, errors, events）
//! - **ports**: 抽象化レイヤー（StateStore, KeyValueStore, ContentGenerator, Publisher, Clock, など）
//! - **impls**: 実装（FileKvStore, GeminiGenerator, OfflineGenerator, SimulatedPublisher, ActivityLog）
//! - **app**: アプリケーションロジック（builder, profiles, planner, autopilot, studio, audit, dashboard）
//! - **codec**: CSV の読み書き
//! - **config**: 設定ファイルと環境変数
//! - **error**: ライブラリ全体のエラー型

pub mod app;
pub mod codec;
pub mod config;
pub mod domain;
pub mod error;
pub mod impls;
pub mod ports;

pub use crate::error::{Result, TubeError};
