pub mod app;
mod check;
mod commands;
mod config;
mod context;
mod dispatch;
mod env;
mod output;
mod run;
mod runtime;
