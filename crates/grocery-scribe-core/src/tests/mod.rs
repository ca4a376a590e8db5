mod extraction;
mod lifecycle;
