mod common;
mod rooms;
mod settlement;
