mod events;
mod mocks;
mod sales;
mod webhook;
