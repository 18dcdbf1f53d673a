mod fixtures;
mod presentation;
