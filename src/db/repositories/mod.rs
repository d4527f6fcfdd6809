mod takes;
