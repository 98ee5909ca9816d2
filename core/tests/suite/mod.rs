mod history;
mod lifecycle;
