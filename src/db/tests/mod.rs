mod temp_paths;
