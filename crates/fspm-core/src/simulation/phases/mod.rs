mod branching;
mod carbon;
mod hormones;
